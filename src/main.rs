use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use web_smoke::checks::ObservationCheck;
use web_smoke::config;
use web_smoke::driver::Readiness;
use web_smoke::evidence::{EvidenceDir, cleanup_old_runs, list_runs};
use web_smoke::runner::{SessionConfig, SmokeRunner};
use web_smoke::selectors::LoginSelectors;

/// web-smoke - Browser-driven smoke testing for authenticated web apps
#[derive(Parser, Debug)]
#[command(
    name = "web-smoke",
    about = "Log into a web application, capture screenshot evidence, and report a verdict",
    after_help = "ENVIRONMENT VARIABLES:\n\
        WEB_SMOKE_BASE_URL       Base URL of the target application\n\
        WEB_SMOKE_USERNAME       Login username\n\
        WEB_SMOKE_PASSWORD       Login password\n\
        WEB_SMOKE_EVIDENCE_DIR   Base directory for evidence runs\n\
        WEB_SMOKE_NAV_TIMEOUT    Navigation timeout (seconds)\n\
        WEB_SMOKE_AUTH_TIMEOUT   Authentication timeout (seconds)\n\
        WEB_SMOKE_BUDGET         Overall run budget (seconds)\n\
        WEB_SMOKE_GRACE          Pre-teardown grace delay (seconds)\n\
        WEB_SMOKE_VIEWPORT       Viewport preset or WxH\n\
        WEB_SMOKE_LOGIN_TOKEN    URL substring marking the login page"
)]
struct Args {
    /// Base URL of the application under test
    #[arg(short, long, env = "WEB_SMOKE_BASE_URL", default_value = config::DEFAULT_BASE_URL)]
    base_url: String,

    /// Login username
    #[arg(short, long, env = "WEB_SMOKE_USERNAME", default_value = config::DEFAULT_USERNAME)]
    username: String,

    /// Login password
    #[arg(short, long, env = "WEB_SMOKE_PASSWORD", default_value = "")]
    password: String,

    /// Viewport: hd (1280x720), fhd (1920x1080), tablet (1024x768), or WxH
    #[arg(long, short = 's', env = "WEB_SMOKE_VIEWPORT", default_value = config::DEFAULT_VIEWPORT)]
    viewport: String,

    /// Show the browser window instead of running headless
    #[arg(long)]
    headed: bool,

    /// Output directory for evidence (default: auto-generated under the evidence dir)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keep evidence after completion (default: kept on failure or when --output is given)
    #[arg(long, short = 'k')]
    keep: bool,

    /// Navigation timeout in seconds
    #[arg(long, env = "WEB_SMOKE_NAV_TIMEOUT", default_value_t = config::DEFAULT_NAV_TIMEOUT)]
    nav_timeout: u64,

    /// Authentication timeout in seconds
    #[arg(long, env = "WEB_SMOKE_AUTH_TIMEOUT", default_value_t = config::DEFAULT_AUTH_TIMEOUT)]
    auth_timeout: u64,

    /// Overall run budget in seconds
    #[arg(long, env = "WEB_SMOKE_BUDGET", default_value_t = config::DEFAULT_BUDGET)]
    budget: u64,

    /// Seconds to hold the browser open before teardown
    #[arg(long, env = "WEB_SMOKE_GRACE", default_value_t = config::DEFAULT_GRACE)]
    grace: u64,

    /// URL substring that marks the login page
    #[arg(long, env = "WEB_SMOKE_LOGIN_TOKEN", default_value = config::DEFAULT_LOGIN_TOKEN)]
    login_token: String,

    /// Readiness condition for navigations: domcontentloaded or networkidle
    #[arg(long, default_value = "networkidle")]
    readiness: String,

    /// Override the username field selector
    #[arg(long)]
    usr_selector: Option<String>,

    /// Override the password field selector
    #[arg(long)]
    pwd_selector: Option<String>,

    /// Override the submit button selector
    #[arg(long)]
    submit_selector: Option<String>,

    /// Region check as MIN=SELECTOR or a bare selector (repeatable)
    #[arg(long = "check-region")]
    check_regions: Vec<String>,

    /// Require this text on the post-login page (repeatable)
    #[arg(long = "check-label")]
    check_labels: Vec<String>,

    /// Require a 2xx response for this asset path (repeatable)
    #[arg(long = "check-asset")]
    check_assets: Vec<String>,

    /// Verify every linked stylesheet actually loaded
    #[arg(long)]
    check_stylesheets: bool,

    /// Report page layout/script durations
    #[arg(long)]
    check_metrics: bool,

    /// Capture full-page screenshots instead of the viewport
    #[arg(long)]
    full_page: bool,

    /// Output the session report as JSON
    #[arg(long)]
    json: bool,

    /// Remove evidence runs older than 24 hours before starting
    #[arg(long)]
    gc: bool,

    /// List existing evidence runs and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    if args.list {
        for run in list_runs()? {
            println!("{}", run.display());
        }
        return Ok(());
    }

    if args.gc {
        let cleaned = cleanup_old_runs(Duration::from_secs(24 * 3600))?;
        if cleaned > 0 && !args.json {
            eprintln!("Removed {} old evidence run(s)", cleaned);
        }
    }

    let viewport = config::parse_viewport(&args.viewport).ok_or_else(|| {
        format!(
            "Invalid viewport '{}'. Use: hd, fhd, tablet, or WxH (e.g., 1440x900)",
            args.viewport
        )
    })?;

    let readiness = Readiness::from_str(&args.readiness).ok_or_else(|| {
        format!(
            "Invalid readiness '{}'. Use: domcontentloaded or networkidle",
            args.readiness
        )
    })?;

    let mut selectors = LoginSelectors::default();
    if let Some(selector) = args.usr_selector {
        selectors = selectors.username_only(selector);
    }
    if let Some(selector) = args.pwd_selector {
        selectors = selectors.password_only(selector);
    }
    if let Some(selector) = args.submit_selector {
        selectors = selectors.submit_only(selector);
    }

    let mut checks: Vec<ObservationCheck> = Vec::new();
    for spec in &args.check_regions {
        checks.push(ObservationCheck::parse_region(spec));
    }
    for text in &args.check_labels {
        checks.push(ObservationCheck::Label { text: text.clone() });
    }
    for path in &args.check_assets {
        checks.push(ObservationCheck::AssetFetch { path: path.clone() });
    }
    if args.check_stylesheets {
        checks.push(ObservationCheck::Stylesheets);
    }
    if args.check_metrics {
        checks.push(ObservationCheck::Metrics);
    }
    if checks.is_empty() {
        // Baseline observations when none are configured
        checks.push(ObservationCheck::Stylesheets);
        checks.push(ObservationCheck::Metrics);
    }

    let mut config = SessionConfig::new(&args.base_url)
        .credentials(&args.username, &args.password)
        .viewport(viewport)
        .nav_timeout(Duration::from_secs(args.nav_timeout))
        .auth_timeout(Duration::from_secs(args.auth_timeout))
        .budget(Duration::from_secs(args.budget))
        .teardown_grace(Duration::from_secs(args.grace))
        .readiness(readiness)
        .login_token(&args.login_token)
        .selectors(selectors)
        .checks(checks)
        .full_page(args.full_page);
    if args.headed {
        config = config.headed();
    }

    // Evidence dir: user-specified dirs are kept, auto-generated ones are
    // named after the target host
    let evidence = if let Some(ref dir) = args.output {
        EvidenceDir::in_dir(dir).keep(true)
    } else {
        let host = url::Url::parse(&args.base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "smoke".to_string());
        EvidenceDir::with_name(&host).keep(args.keep)
    };
    evidence.init(&args.base_url)?;

    let runner = SmokeRunner::new(config);
    let report = runner.run(&evidence).await;

    std::fs::write(evidence.report_path(), report.to_json()?)?;

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render_console());
        println!("evidence: {}", evidence.dir.display());
    }

    let passed = report.passed();

    // Evidence from a failed run is the whole point; keep it around
    if args.keep || args.output.is_some() || !passed {
        std::mem::forget(evidence);
    }

    if !passed {
        std::process::exit(1);
    }
    Ok(())
}
