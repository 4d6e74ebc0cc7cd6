//! Cookie File Encryption Utility
//!
//! Encrypts a plaintext cookie export (JSON array) so it can be used as the
//! persisted session file with `TWITTER_COOKIE_KEY` set.
//!
//! Usage: encrypt_cookies <plaintext.json> <encrypted-output>

use log::info;

use xharvest::crypto::CookieCipher;
use xharvest::store::{read_cookie_file, SessionStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <plaintext.json> <encrypted-output>", args[0]);
        std::process::exit(2);
    }

    let key = match std::env::var("TWITTER_COOKIE_KEY") {
        Ok(key) => key,
        Err(_) => {
            eprintln!("❌ Error: TWITTER_COOKIE_KEY environment variable is not set.");
            eprintln!();
            eprintln!("Generate a key with:");
            eprintln!("  openssl rand -hex 32");
            std::process::exit(1);
        }
    };
    let cipher = CookieCipher::from_hex_key(&key)?;

    let cookies = read_cookie_file(std::path::Path::new(&args[1])).await?;
    if cookies.is_empty() {
        eprintln!("❌ Error: {} holds no cookies", args[1]);
        std::process::exit(1);
    }
    info!("Read {} cookies from {}", cookies.len(), args[1]);

    let store = SessionStore::new(&args[2], Some(cipher));
    store.save(&cookies).await?;

    println!("✅ Wrote encrypted session file {}", args[2]);
    Ok(())
}
