pub mod address;
pub mod config;
pub mod data;
pub mod dedup;
pub mod error;
pub mod matrix;
pub mod pipeline;
pub mod registry;
pub mod report;
pub mod table;

pub use config::Config;
pub use error::CoreError;
pub use matrix::{ConnectivityAggregator, ConnectivityMatrix, LATAM_COUNTRIES};
pub use registry::{CountryAuthority, CountryRegistry, Iso3166};
pub use table::{CountryTable, RecordTable};

const BANNER: &str = r#"
  _       _                                      
 | | __ _| |_ __ _ _ __ ___   ___ ___  _ __  _ __  
 | |/ _` | __/ _` | '_ ` _ \ / __/ _ \| '_ \| '_ \ 
 | | (_| | || (_| | | | | | | (_| (_) | | | | | | |
 |_|\__,_|\__\__,_|_| |_| |_|\___\___/|_| |_|_| |_|
"#;

pub fn print_banner() {
    println!("{}", BANNER);
    println!(
        "  v{} - Latin-American co-authorship connectivity\n",
        env!("CARGO_PKG_VERSION")
    );
}
