use crate::utils::url::normalize_base_url;
use keyring::Entry;
use std::io::{self, Write};

const KEYRING_SERVICE: &str = "plausch";

/// Stores the backend bearer token in the OS keyring, one credential per
/// server so switching between a staging and a production backend keeps
/// both tokens around.
pub struct TokenStore {
    use_keyring: bool,
}

impl TokenStore {
    pub fn new() -> Self {
        Self { use_keyring: true }
    }

    /// A store that never touches the OS keyring. Used in tests and in
    /// environments without a secret service.
    pub fn disabled() -> Self {
        Self { use_keyring: false }
    }

    pub fn store_token(&self, server_url: &str, token: &str) -> Result<(), Box<dyn std::error::Error>> {
        if !self.use_keyring {
            return Ok(());
        }
        let entry = Entry::new(KEYRING_SERVICE, &keyring_account(server_url))?;
        entry.set_password(token)?;
        Ok(())
    }

    pub fn get_token(&self, server_url: &str) -> Result<Option<String>, Box<dyn std::error::Error>> {
        if !self.use_keyring {
            return Ok(None);
        }
        let entry = Entry::new(KEYRING_SERVICE, &keyring_account(server_url))?;
        match entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    pub fn remove_token(&self, server_url: &str) -> Result<(), Box<dyn std::error::Error>> {
        if !self.use_keyring {
            return Ok(());
        }
        let entry = Entry::new(KEYRING_SERVICE, &keyring_account(server_url))?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Box::new(e)),
        }
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Keyring account name for a server. Normalized so that trailing slashes
/// do not split one server's token across accounts.
fn keyring_account(server_url: &str) -> String {
    normalize_base_url(server_url)
}

/// `plausch auth`: store a bearer token for the given server. The token can
/// be passed on the command line; otherwise it is read from stdin.
pub fn run_auth_setup(server_url: &str, token: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let server = keyring_account(server_url);
    println!("🔐 Plausch Authentication");
    println!();
    println!("Server: {server}");
    let token = match token {
        Some(token) => token,
        None => prompt_token()?,
    };
    let token = token.trim();
    if token.is_empty() {
        return Err("No token entered, nothing stored".into());
    }
    TokenStore::new().store_token(&server, token)?;
    println!("✅ Token stored for {server}");
    Ok(())
}

/// `plausch deauth`: forget the stored token for the given server.
pub fn run_deauth(server_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let server = keyring_account(server_url);
    let store = TokenStore::new();
    match store.get_token(&server)? {
        Some(_) => {
            store.remove_token(&server)?;
            println!("✅ Removed stored token for {server}");
        }
        None => {
            println!("No stored token for {server}");
        }
    }
    Ok(())
}

fn prompt_token() -> Result<String, Box<dyn std::error::Error>> {
    print!("Enter bearer token: ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
