use std::env::{self, consts};
use std::io;
use std::path::Path;
use std::process;
use tracing::{error, info};
use weblaunch::dispatch::is_help_token;
use weblaunch::filesystem::RealFileSystem;
use weblaunch::{
    bootstrap, logging, register_launchers, settings, Dispatcher, ExecutionContext, Invocation,
    Product, Settings, WeblaunchError, Workspace,
};

const USAGE_EXIT: i32 = 2;
const FATAL_EXIT: i32 = 1;

fn main() {
    process::exit(run());
}

fn run() -> i32 {
    let args: Vec<String> = env::args().collect();
    let product = Product::current();
    let program = args
        .first()
        .and_then(|arg| Path::new(arg).file_name())
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| product.name.clone());

    if args.len() <= 1 || is_help_token(&args[1]) {
        eprint!("{}", usage_text(&product, &program));
        return USAGE_EXIT;
    }

    let fs = RealFileSystem;
    let prepared = bootstrap::config_root()
        .and_then(|root| Workspace::prepare(&fs, &root, &product));
    let (workspace, log_file) = match prepared {
        Ok(prepared) => prepared,
        Err(err) => {
            eprintln!("{}: {}", program, WeblaunchError::Bootstrap(err));
            return FATAL_EXIT;
        }
    };

    eprintln!("{}", product.banner());
    let settings = Settings::load(&fs, &workspace.settings_file());
    let (verbose, json_log) = settings
        .as_ref()
        .map(|settings| (settings.verbose, settings.json_log))
        .unwrap_or_default();
    logging::setup_logging(Some(log_file), verbose, json_log);
    info!(args = ?args, "Starting {}", product.banner());
    info!(os = consts::OS, arch = consts::ARCH, "Current platform");

    let settings = match settings {
        Ok(settings) => settings,
        Err(err) => return fatal(&program, err.into()),
    };
    info!(
        proxy = %settings::proxy_environment(),
        use_http_proxy_environment_variable = settings.use_http_proxy_environment_variable,
        "Proxy settings"
    );
    settings.apply_proxy_policy();

    let registry = match register_launchers(&settings) {
        Ok(registry) => registry,
        Err(err) => return fatal(&program, err.into()),
    };

    let invocation = match Invocation::parse(&args[1..]) {
        Ok(invocation) => invocation,
        Err(err) => {
            error!(error = %err, "Invalid command line");
            eprintln!("{}", err);
            eprint!("{}", usage_text(&product, &program));
            return USAGE_EXIT;
        }
    };

    let context = ExecutionContext::new(&workspace.work_dir, &workspace.log_file, &product.title);
    let dispatcher = Dispatcher::new(&registry, &settings, &fs, context);
    let mode = invocation.mode();
    match dispatcher.dispatch(mode, &mut io::stdin().lock(), &mut io::stdout().lock()) {
        Ok(outcome) => {
            info!(outcome = ?outcome, "Done");
            0
        }
        Err(err) => fatal(&program, err),
    }
}

fn fatal(program: &str, err: WeblaunchError) -> i32 {
    error!(error = %err, "Fatal error");
    eprintln!("{}: {}", program, err);
    FATAL_EXIT
}

fn usage_text(product: &Product, program: &str) -> String {
    let mut text = String::new();
    text.push_str(&format!("{}\n\n", product.banner()));
    text.push_str("Usage:\n");
    text.push_str(&format!("{} [options] <filename | URL>\n\n", program));
    text.push_str("Options:\n");
    for (flag, help) in [
        ("-javaDir <java folder>", "use Java from <java folder>"),
        ("-showConsole", "show Java console"),
        ("-disableVerification", "don't verify jar signatures"),
        (
            "-disableVerificationSameOrigin",
            "don't verify all jars have same signature",
        ),
        ("-uninstall", "uninstall app"),
        ("-gui", "show GUI, uninstall only"),
        ("-help", "show help"),
    ] {
        text.push_str(&format!("  {}\n      {}\n", flag, help));
    }
    text
}
