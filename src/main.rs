// src/main.rs

use kubefan::{cli, logging};

#[tokio::main]
async fn main() {
    let args = cli::parse();
    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("kubefan error: {err:?}");
        std::process::exit(1);
    }

    match kubefan::run(args).await {
        Ok(code) if code != 0 => std::process::exit(code),
        Ok(_) => {}
        Err(err) => {
            eprintln!("kubefan error: {err:?}");
            std::process::exit(1);
        }
    }
}
