use advfilter::cli::run;
use advfilter::error::FilterError;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    // Plain output is fine where the console cannot do ANSI
    let _ = enable_ansi_support::enable_ansi_support();

    if let Err(e) = run() {
        let rejected = e.downcast_ref::<FilterError>().is_some_and(FilterError::is_client_error);
        let error_str: String = e.to_string();
        if !rejected
            && (error_str.contains("database") || error_str.contains("constraint")
                || error_str.contains("SQLite") || error_str.contains("Failed to"))
        {
            eprintln!("Internal error: {}", e);
            let mut source = e.source();
            if source.is_some() {
                eprintln!("\nCaused by:");
                let mut indent = 1;
                while let Some(err) = source {
                    eprintln!("{:indent$}  {}", "", err);
                    source = err.source();
                    indent += 1;
                }
            }
            std::process::exit(2);
        } else {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
