//! Command handlers and terminal output.

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use tracing::{debug, warn};

use supermall_core::api::{ApiClient, Filters};
use supermall_core::auth::{
    AuthError, FileProfileStore, FileTokenStore, FirebaseAuthProvider, IdentityBridge,
    KeyringTokenStore, MemoryTokenStore, Registration, TokenStore,
};
use supermall_core::catalog::{categories, ProductQuery, ProductSort, ShopQuery, ShopSort};
use supermall_core::config::{Config, TokenStorage};
use supermall_core::models::{
    LoginRequest, NewReview, Offer, Product, RegisterRequest, Review, Role, Shop,
};
use supermall_core::utils::{format_date, format_price, truncate};

use crate::Command;

const NAME_WIDTH: usize = 32;

/// Everything a command needs: configuration, the API client and, when a
/// Firebase key is configured, the identity bridge.
pub struct Context {
    config: Config,
    api: ApiClient,
    bridge: Option<IdentityBridge>,
}

impl Context {
    pub fn new(api_url: Option<String>) -> Result<Self> {
        let mut config = Config::load()?;
        if let Some(url) = api_url {
            config.api_base_url = url;
        }

        let cache_dir = config.cache_dir()?;
        let tokens: Arc<dyn TokenStore> = match config.token_storage {
            TokenStorage::File => Arc::new(FileTokenStore::open(&cache_dir)),
            TokenStorage::Keyring => Arc::new(KeyringTokenStore::open()),
            TokenStorage::Memory => Arc::new(MemoryTokenStore::new()),
        };
        let api = ApiClient::from_config(&config, tokens)?;

        let bridge = match config.firebase_api_key.as_deref() {
            Some(key) => {
                let provider = FirebaseAuthProvider::new(key)?;
                let profiles = FileProfileStore::new(&cache_dir)?;
                let bridge = IdentityBridge::new(Arc::new(provider), Arc::new(profiles), api.clone());
                bridge.start();
                Some(bridge)
            }
            None => {
                debug!("No Firebase API key configured, using backend accounts only");
                None
            }
        };

        Ok(Self {
            config,
            api,
            bridge,
        })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub async fn shutdown(&self) {
        if let Some(bridge) = &self.bridge {
            bridge.stop().await;
        }
    }

    fn remember_email(&mut self, email: &str) {
        self.config.last_email = Some(email.to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }
}

pub async fn dispatch(ctx: &mut Context, command: Command) -> Result<()> {
    match command {
        Command::Home => home(ctx).await,
        Command::Shops {
            search,
            category,
            sort,
        } => {
            let query = ShopQuery {
                search,
                category,
                sort: sort.parse::<ShopSort>().map_err(|e| anyhow!(e))?,
            };
            shops(ctx, &query).await
        }
        Command::Shop { id } => shop(ctx, id).await,
        Command::Products {
            search,
            category,
            shop_id,
            min_price,
            max_price,
            sort,
        } => {
            if min_price > max_price {
                bail!("--min-price must not exceed --max-price");
            }
            let query = ProductQuery {
                search,
                category,
                min_price,
                max_price,
                sort: sort.parse::<ProductSort>().map_err(|e| anyhow!(e))?,
            };
            products(ctx, &query, shop_id).await
        }
        Command::Offers => {
            let offers = ctx.api.list_offers().await?;
            print_offers(&offers);
            Ok(())
        }
        Command::Reviews { shop_id } => {
            let reviews = ctx.api.list_reviews(shop_id).await?;
            print_reviews(&reviews);
            Ok(())
        }
        Command::Review {
            shop_id,
            rating,
            comment,
        } => {
            if !ctx.api.is_authenticated() {
                bail!("Not signed in. Run `supermall login <email>` first.");
            }
            let review = ctx
                .api
                .create_review(&NewReview {
                    shop_id,
                    rating,
                    comment,
                })
                .await?;
            println!("Posted review {} {}", review.id, review.stars());
            Ok(())
        }
        Command::Search { query, category } => search(ctx, &query, category).await,
        Command::Register { name, email, role } => register(ctx, name, email, role).await,
        Command::Login { email } => login(ctx, &email).await,
        Command::Logout => logout(ctx).await,
        Command::Whoami => {
            whoami(ctx);
            Ok(())
        }
    }
}

// ===== Browsing =====

async fn home(ctx: &Context) -> Result<()> {
    let (shops, offers) = futures::try_join!(ctx.api.list_shops(), ctx.api.list_offers())?;

    println!("Featured shops");
    let featured: Vec<&Shop> = ShopQuery {
        sort: ShopSort::Rating,
        ..Default::default()
    }
    .apply(&shops)
    .into_iter()
    .take(6)
    .collect();
    print_shops(&featured);

    println!();
    println!("Current offers");
    let active: Vec<Offer> = offers.into_iter().filter(|o| o.is_active).collect();
    print_offers(&active);
    Ok(())
}

async fn shops(ctx: &Context, query: &ShopQuery) -> Result<()> {
    let all = ctx.api.list_shops().await?;
    let matched = query.apply(&all);
    print_shops(&matched);
    println!(
        "\n{} of {} shops. Categories: {}",
        matched.len(),
        all.len(),
        categories(all.iter().map(|s| s.category.as_str())).join(", ")
    );
    Ok(())
}

async fn shop(ctx: &Context, id: i64) -> Result<()> {
    let (shop, reviews) = futures::try_join!(ctx.api.get_shop(id), ctx.api.list_reviews(id))?;

    println!("{} ({})", shop.name, shop.status_label());
    println!("  Category: {}", shop.category);
    println!("  Rating:   {:.1}", shop.display_rating());
    if let Some(location) = shop.address.as_deref().or(shop.location.as_deref()) {
        println!("  Address:  {}", location);
    }
    if let Some(phone) = &shop.phone {
        println!("  Phone:    {}", phone);
    }
    if let Some(description) = &shop.description {
        println!("\n{}", description);
    }
    println!();
    print_reviews(&reviews);
    Ok(())
}

async fn products(ctx: &Context, query: &ProductQuery, shop_id: Option<i64>) -> Result<()> {
    // Category and shop narrow the request; the rest is filtered locally.
    let server_category = query
        .category
        .as_deref()
        .filter(|c| !c.eq_ignore_ascii_case(supermall_core::catalog::ALL_CATEGORIES));
    let filters = Filters::new()
        .with_opt("category", server_category)
        .with_opt("shop_id", shop_id);

    let all = ctx.api.list_products(&filters).await?;
    let matched = query.apply(&all);
    print_products(&matched);
    println!("\n{} of {} products", matched.len(), all.len());
    Ok(())
}

async fn search(ctx: &Context, query: &str, category: Option<String>) -> Result<()> {
    let filters = Filters::new().with_opt("category", category);
    let results = ctx.api.search(query, &filters).await?;
    if results.is_empty() {
        println!("No results for \"{}\"", query);
        return Ok(());
    }

    if !results.shops.is_empty() {
        println!("Shops");
        print_shops(&results.shops.iter().collect::<Vec<_>>());
    }
    if !results.products.is_empty() {
        if !results.shops.is_empty() {
            println!();
        }
        println!("Products");
        print_products(&results.products.iter().collect::<Vec<_>>());
    }
    Ok(())
}

// ===== Account =====

fn prompt_password(prompt: &str) -> Result<String> {
    let password = rpassword::prompt_password(prompt)?;
    if password.is_empty() {
        bail!("Password required");
    }
    Ok(password)
}

async fn register(ctx: &mut Context, name: String, email: String, role: Role) -> Result<()> {
    let password = prompt_password("Password: ")?;
    let confirm = prompt_password("Confirm password: ")?;
    if password != confirm {
        bail!("Passwords do not match");
    }

    match &ctx.bridge {
        Some(bridge) => {
            let registration = Registration {
                name,
                email: email.clone(),
                role,
            };
            let session = bridge
                .register(&registration, &password)
                .await
                .map_err(describe_auth_error)?;
            println!("Welcome, {}!", session.identity.label());
        }
        None => {
            let request = RegisterRequest {
                name,
                email: email.clone(),
                password,
                role,
            };
            let auth = ctx.api.register(&request).await?;
            ctx.api.set_token(Some(auth.access_token));
            println!("Welcome, {}!", auth.user.name);
        }
    }

    ctx.remember_email(&email);
    Ok(())
}

async fn login(ctx: &mut Context, email: &str) -> Result<()> {
    let password = prompt_password("Password: ")?;

    match &ctx.bridge {
        Some(bridge) => {
            let session = bridge
                .login(email, &password)
                .await
                .map_err(describe_auth_error)?;
            println!("Signed in as {} ({})", session.identity.label(), session.role());
        }
        None => {
            let auth = ctx
                .api
                .login(&LoginRequest {
                    email: email.to_string(),
                    password,
                })
                .await?;
            ctx.api.set_token(Some(auth.access_token));
            println!("Signed in as {} ({})", auth.user.name, auth.user.role);
        }
    }

    ctx.remember_email(email);
    Ok(())
}

async fn logout(ctx: &Context) -> Result<()> {
    match &ctx.bridge {
        Some(bridge) => bridge.logout().await?,
        None => ctx.api.set_token(None),
    }
    println!("Signed out");
    Ok(())
}

fn whoami(ctx: &Context) {
    match (ctx.api.is_authenticated(), ctx.config.last_email.as_deref()) {
        (true, Some(email)) => println!("Signed in as {}", email),
        (true, None) => println!("Signed in"),
        (false, _) => println!("Not signed in"),
    }
}

fn describe_auth_error(e: AuthError) -> anyhow::Error {
    match e {
        AuthError::CredentialExchange { identity, source } => anyhow!(source).context(format!(
            "Signed in as {} but the marketplace rejected the account",
            identity.label()
        )),
        other => anyhow!(other),
    }
}

// ===== Output =====

fn print_shops(shops: &[&Shop]) {
    if shops.is_empty() {
        println!("  No shops found");
        return;
    }
    for shop in shops {
        println!(
            "  {:>4}  {:<width$}  {:<16}  {:.1}  {}",
            shop.id,
            truncate(&shop.name, NAME_WIDTH),
            truncate(&shop.category, 16),
            shop.display_rating(),
            shop.status_label(),
            width = NAME_WIDTH,
        );
    }
}

fn print_products(products: &[&Product]) {
    if products.is_empty() {
        println!("  No products found");
        return;
    }
    for product in products {
        let discount = product
            .discount_percent()
            .map(|pct| format!(" (-{}%)", pct))
            .unwrap_or_default();
        let stock = if product.in_stock { "" } else { "  out of stock" };
        println!(
            "  {:>4}  {:<width$}  {:>10}{}{}",
            product.id,
            truncate(&product.name, NAME_WIDTH),
            format_price(product.price),
            discount,
            stock,
            width = NAME_WIDTH,
        );
    }
}

fn print_offers(offers: &[Offer]) {
    if offers.is_empty() {
        println!("  No offers right now");
        return;
    }
    for offer in offers {
        let until = offer
            .end_date
            .as_deref()
            .map(|d| format!("  until {}", format_date(d)))
            .unwrap_or_default();
        let shop = offer
            .shop_name
            .as_deref()
            .map(|s| format!(" at {}", s))
            .unwrap_or_default();
        println!(
            "  {:>4}  {}{}: {}{}",
            offer.id,
            offer.title,
            shop,
            offer.discount_label(),
            until
        );
    }
}

fn print_reviews(reviews: &[Review]) {
    let approved: Vec<&Review> = reviews.iter().filter(|r| r.is_approved).collect();
    if approved.is_empty() {
        println!("  No reviews yet");
        return;
    }
    for review in approved {
        let date = review
            .created_at
            .as_deref()
            .map(format_date)
            .unwrap_or_default();
        println!(
            "  {}  {}  {}",
            review.stars(),
            date,
            review.comment.as_deref().unwrap_or("")
        );
    }
}
