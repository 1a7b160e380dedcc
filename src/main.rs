use clap::Parser;
use site_estimator::config::{CartCommand, Command};
use site_estimator::core::schema::{FieldKind, FieldSpec};
use site_estimator::domain::ports::ConfigProvider;
use site_estimator::utils::error::ErrorSeverity;
use site_estimator::utils::format::format_inr;
use site_estimator::utils::{logger, validation::Validate};
use site_estimator::{
    CartItem, CliConfig, ContactForm, EstimateView, EstimationSession, Estimator, EstimatorError,
    SubmitNotice, TomlConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting site-estimator");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let estimator = match build_estimator(&cli) {
        Ok(estimator) => estimator,
        Err(e) => exit_with(e),
    };

    if let Err(e) = run(&estimator, cli.command).await {
        exit_with(e);
    }

    Ok(())
}

fn build_estimator(cli: &CliConfig) -> Result<Estimator, EstimatorError> {
    let provider: Box<dyn ConfigProvider> = match &cli.config {
        Some(path) => {
            tracing::info!("📄 Loading configuration from {}", path.display());
            let config = TomlConfig::from_file(path)?;
            config.validate()?;
            Box::new(config)
        }
        None => {
            cli.validate()?;
            Box::new(cli.clone())
        }
    };

    Estimator::from_config(provider.as_ref())
}

async fn run(estimator: &Estimator, command: Command) -> Result<(), EstimatorError> {
    match command {
        Command::Inputs { slug } => {
            let session = estimator.open(&slug).await;
            print_header(&session);
            match session.form() {
                Some(form) => print_fields(form.fields(), &|path: &str| form.value(path), ""),
                None => print_custom_estimation(&session),
            }
        }
        Command::Estimate { slug, overrides } => {
            let session = open_with_overrides(estimator, &slug, &overrides).await?;
            print_header(&session);
            if session.is_custom_estimation() {
                print_custom_estimation(&session);
            } else {
                print_estimate(&session.recalculate().await);
            }
        }
        Command::Add { slug, overrides } => {
            let session = open_with_overrides(estimator, &slug, &overrides).await?;
            let view = session.recalculate().await;
            print_estimate(&view);
            let cart = session.add_to_cart(estimator.cart())?;
            println!("🛒 Added {} to cart ({} item(s))", session.title(), cart.len());
        }
        Command::Cart(CartCommand::List) => print_cart(&estimator.cart().get_cart()),
        Command::Cart(CartCommand::Remove { position }) => {
            let index = position
                .checked_sub(1)
                .ok_or_else(|| EstimatorError::validation("position", "positions start at 1"))?;
            let cart = estimator.cart().remove_from_cart(index)?;
            print_cart(&cart);
        }
        Command::Cart(CartCommand::Clear) => {
            estimator.cart().clear_cart()?;
            println!("🛒 Cart cleared");
        }
        Command::Submit {
            name,
            email,
            phone,
            message,
        } => {
            let mut form = ContactForm {
                name,
                email,
                phone,
                message,
            };
            let items = estimator.cart().get_cart();
            let outcome = estimator.submission().submit(&items, &mut form).await;
            let notice = SubmitNotice::from_outcome(&outcome);
            if notice.is_success() {
                println!("✅ {}", notice.message());
            } else {
                eprintln!("❌ {}", notice.message());
            }
            outcome?;
        }
    }
    Ok(())
}

async fn open_with_overrides(
    estimator: &Estimator,
    slug: &str,
    overrides: &[(String, String)],
) -> Result<EstimationSession, EstimatorError> {
    let mut session = estimator.open(slug).await;
    if !overrides.is_empty() {
        session.apply_overrides(overrides.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
    }
    Ok(session)
}

fn print_header(session: &EstimationSession) {
    println!("{} ({})", session.title(), session.service_id());
    if let Some(description) = session.description() {
        println!("{}", description);
    }
}

fn print_custom_estimation(session: &EstimationSession) {
    println!(
        "💬 {} needs a custom estimate. Send us a message and we'll get back to you.",
        session.title()
    );
}

fn print_fields(fields: &[FieldSpec], value: &dyn Fn(&str) -> Option<serde_json::Value>, prefix: &str) {
    for field in fields {
        let path = format!("{}{}", prefix, field.name);
        match &field.kind {
            FieldKind::Group { fields } => {
                println!("  {} ({}):", field.label, path);
                print_fields(fields, value, &format!("{}.", path));
            }
            kind => {
                let current = value(&path).unwrap_or(serde_json::Value::Null);
                let hint = match kind {
                    FieldKind::Count { min, .. } => format!("number, min {}", min),
                    FieldKind::Toggle { .. } => "true/false".to_string(),
                    FieldKind::Choice { options, .. } => options
                        .iter()
                        .map(|o| format!("{} = {}", o.value, o.label))
                        .collect::<Vec<_>>()
                        .join(", "),
                    FieldKind::Group { .. } => String::new(),
                };
                println!("  {:<28} {:<20} [{}] {}", path, field.label, hint, current);
            }
        }
    }
}

fn print_estimate(view: &EstimateView) {
    for line in &view.breakdown {
        println!("  {:<30} {}", line.label, format_inr(line.value));
    }
    println!("Estimated total: {}", format_inr(view.total));
    if let Some(error) = &view.error {
        eprintln!("⚠️ {}", error);
    }
}

fn print_cart(items: &[CartItem]) {
    if items.is_empty() {
        println!("🛒 Cart is empty");
        return;
    }
    for (i, item) in items.iter().enumerate() {
        println!("{}. {}: {}", i + 1, item.title, format_inr(item.amount));
    }
    let total: f64 = items.iter().map(|item| item.amount).sum();
    println!("Total: {}", format_inr(total));
}

fn exit_with(e: EstimatorError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 4,      // 輸入錯誤
        ErrorSeverity::Medium => 2,   // 可重試
        ErrorSeverity::High => 1,     // 配置錯誤
        ErrorSeverity::Critical => 3, // 系統錯誤
    };
    std::process::exit(exit_code);
}
