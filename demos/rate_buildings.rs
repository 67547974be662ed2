use anyhow::Result;
use besapi::Client;
use besapi::unroll::{remove_unknown, unroll};
use besapi::workflow::{Selection, fetch_reports};

fn main() -> Result<()> {
    // Example program that walks every building on the account.
    // Configure authentication via env vars or a `.besapirc` file.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?),
        )
        .try_init();

    let client = Client::from_env()?;
    let mut incomplete = Vec::new();

    for (report, kind) in fetch_reports(&client, &mut incomplete, Selection::All, None)? {
        let flat = remove_unknown(&unroll(&report.into_value())?);
        println!("{kind}: {}", serde_json::to_string_pretty(&flat)?);
    }

    for bldg in &incomplete {
        let status = bldg.status.as_ref().map_or("unknown", |s| s.as_str());
        println!("{} building {} not rated yet ({status})", bldg.bldg_type, bldg.bldg_id);
    }
    Ok(())
}
