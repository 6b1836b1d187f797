use std::env;
use std::path::PathBuf;

use kubesmith_mcp::run_stdio_server_with_root;

#[tokio::main]
async fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let mut args = env::args().skip(1);
    let mut workspace_root: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        if let Some(path) = arg.strip_prefix("--workspace=") {
            workspace_root = Some(PathBuf::from(path));
        } else if arg == "--workspace" {
            match args.next() {
                Some(path) => workspace_root = Some(PathBuf::from(path)),
                None => {
                    eprintln!("--workspace requires a path argument");
                    std::process::exit(1);
                }
            }
        } else {
            eprintln!("unknown argument: {arg}");
            std::process::exit(1);
        }
    }

    if let Err(err) = run_stdio_server_with_root(workspace_root).await {
        eprintln!("kubesmith-mcp server failed: {err}");
        std::process::exit(1);
    }
}
