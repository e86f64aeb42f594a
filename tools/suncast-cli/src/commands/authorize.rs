//! One-time PIN authorization for the posting account.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use suncast_common::config::AppConfig;
use suncast_publisher::{ConsumerKeys, TwitterAuthorizer};

pub async fn run(config: &AppConfig, keyfile: PathBuf) -> anyhow::Result<()> {
    let consumer = ConsumerKeys::from_keyfile(&keyfile)?;
    let authorizer = TwitterAuthorizer::new(consumer, &config.publish)?;

    let request = authorizer.request_token().await?;
    println!("Visit this URL while signed in as the posting account:");
    println!();
    println!("  {}", request.authorize_url);
    println!();
    print!("Enter the PIN shown after authorizing: ");
    std::io::stdout().flush()?;

    let mut pin = String::new();
    std::io::stdin().lock().read_line(&mut pin)?;

    let access = authorizer.access_token(&request, &pin).await?;
    if let Some(name) = &access.screen_name {
        println!("Authorized as @{name}");
    }
    println!();
    println!("Add these to the \"twitter\" object in {}:", keyfile.display());
    println!("  \"access_key\": \"{}\",", access.key);
    println!("  \"access_secret\": \"{}\"", access.secret);

    Ok(())
}
