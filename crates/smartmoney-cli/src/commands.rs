//! Command handlers. Each one drives the session manager and prints a
//! short human-readable result.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{debug, warn};

use smartmoney_core::{
    ApiClient, Config, GuardDecision, LoginRequest, Registration, RouteGuard, SessionError,
    SessionManager, SessionOptions, SessionState, UpdateUser,
};

/// Turn a session error into the one-line message a user should see.
fn friendly(err: SessionError) -> anyhow::Error {
    debug!(error = ?err, "Command failed");
    anyhow::anyhow!(err.user_message())
}

fn prompt(label: &str) -> Result<String> {
    eprint!("{}", label);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read input")?;
    Ok(line.trim().to_string())
}

fn prompt_new_password() -> Result<String> {
    let password = rpassword::prompt_password("New password: ").context("Failed to read password")?;
    let confirm = rpassword::prompt_password("Confirm password: ").context("Failed to read password")?;
    if password != confirm {
        anyhow::bail!("Passwords do not match");
    }
    Ok(password)
}

/// Build the manager, restore any saved session and refresh it if it is close to expiry.
pub async fn build_manager(config: &Config) -> Result<SessionManager> {
    let client = ApiClient::from_config(config).context("Failed to create HTTP client")?;
    let manager = SessionManager::new(
        Arc::new(client),
        config.build_store()?,
        SessionOptions::from_config(config),
    );
    if let Err(e) = manager.restore() {
        warn!(error = %e, "Could not restore saved session");
    }
    if let Err(e) = manager.ensure_fresh().await {
        warn!(error = %e, "Could not refresh saved session");
    }
    Ok(manager)
}

pub async fn login(manager: &SessionManager, config: &mut Config, email: Option<String>) -> Result<()> {
    let email = match email.or_else(|| config.last_email.clone()) {
        Some(e) if !e.is_empty() => e,
        _ => prompt("Email: ")?,
    };
    let password = rpassword::prompt_password(format!("Password for {}: ", email))
        .context("Failed to read password")?;

    let credential = manager
        .authenticate(&LoginRequest::new(email.clone(), password))
        .await
        .map_err(friendly)?;

    config.last_email = Some(email.clone());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    match credential.minutes_until_expiry() {
        Some(minutes) => println!("Logged in as {} (session expires in {} min)", email, minutes),
        None => println!("Logged in as {}", email),
    }
    Ok(())
}

pub async fn register(
    manager: &SessionManager,
    config: &mut Config,
    name: String,
    last_name: String,
    email: String,
    birth_date: NaiveDate,
) -> Result<()> {
    let password = prompt_new_password()?;
    let registration = Registration {
        name,
        last_name,
        email: email.clone(),
        password,
        date_of_birth: Some(birth_date),
        age: None,
    };
    manager.register(&registration).await.map_err(friendly)?;

    config.last_email = Some(email.clone());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }
    println!("Account created, logged in as {}", email);
    Ok(())
}

pub async fn logout(manager: &SessionManager) {
    manager.logout().await;
    println!("Logged out");
}

pub async fn whoami(manager: &SessionManager) -> Result<()> {
    let profile = manager.whoami().await.map_err(friendly)?;
    println!("{}", profile.full_name());
    println!("  email:   {}", profile.email);
    if let Some(age) = profile.age {
        println!("  age:     {}", age);
    }
    if let Some(dob) = profile.date_of_birth {
        println!("  born:    {}", dob.format("%b %d, %Y"));
    }
    if let Some(ref url) = profile.profile_url {
        println!("  picture: {}", url);
    }
    Ok(())
}

pub async fn status(manager: &SessionManager) -> Result<()> {
    let state = manager.session_state();
    match manager.credential() {
        Some(credential) if state == SessionState::Authenticated => {
            match credential.minutes_until_expiry() {
                Some(minutes) => println!("{} ({} min remaining)", state, minutes),
                None => println!("{}", state),
            }
        }
        _ => println!("{}", state),
    }
    if state.is_authenticated() && !manager.is_authenticated().await {
        println!("Backend did not confirm the session");
    }
    Ok(())
}

pub async fn refresh(manager: &SessionManager) -> Result<()> {
    let credential = manager.refresh().await.map_err(friendly)?;
    match credential.minutes_until_expiry() {
        Some(minutes) => println!("Session refreshed ({} min remaining)", minutes),
        None => println!("Session refreshed"),
    }
    Ok(())
}

pub fn navigate(manager: &SessionManager, path: &str) {
    let guard = RouteGuard::default();
    match manager.guard(&guard, path) {
        GuardDecision::Allow => println!("allow {}", path),
        GuardDecision::Redirect(to) => println!("redirect {} -> {}", path, to),
    }
}

pub async fn update_profile(
    manager: &SessionManager,
    id: i64,
    name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    birth_date: Option<NaiveDate>,
) -> Result<()> {
    let update = UpdateUser {
        name,
        last_name,
        email,
        date_of_birth: birth_date,
        ..UpdateUser::default()
    };
    let profile = manager.update_profile(id, &update).await.map_err(friendly)?;
    println!("Profile updated: {} <{}>", profile.full_name(), profile.email);
    Ok(())
}

pub async fn change_password(manager: &SessionManager, id: i64) -> Result<()> {
    let password = prompt_new_password()?;
    let update = UpdateUser {
        password: Some(password),
        ..UpdateUser::default()
    };
    manager.update_profile(id, &update).await.map_err(friendly)?;
    println!("Password changed");
    Ok(())
}

pub async fn upload_picture(manager: &SessionManager, id: i64, file: &Path) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid file name: {}", file.display()))?;
    let url = manager
        .upload_profile_picture(id, file_name, &bytes)
        .await
        .map_err(friendly)?;
    println!("Profile picture uploaded: {}", url);
    Ok(())
}
