//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api;
use crate::config::Config;
use crate::service::{RegistrationService, ViewOutcome};
use comesol_core::{CadastroError, Cpf, Member, RouteDecision, cpf_digits, validate_cpf};

fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: &Config) -> Result<(), CadastroError> {
    let service = config.build_service()?;

    println!("COMESOL Cadastro Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", config.server.host);
    println!("  Port:     {}", config.server.port);
    println!("  Backend:  {}", config.backend.kind);
    println!();
    println!("Endpoints:");
    println!("  POST   /login              - Sign in");
    println!("  GET    /route              - Post-login destination");
    println!("  POST   /cadastro           - Save group and members");
    println!("  GET    /visualizacao       - View saved registration");
    println!("  DELETE /members/{{id}}       - Remove a member");
    println!("  POST   /visualizacao/save  - Confirm registration");
    println!("  GET    /health             - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(service, &config.server).await
}

// =============================================================================
// VALIDATE-CPF COMMAND
// =============================================================================

/// Check each CPF; fails if any of them is invalid.
pub fn cmd_validate_cpf(cpfs: &[String], json_mode: bool) -> Result<(), CadastroError> {
    let mut invalid = Vec::new();
    let mut results = Vec::with_capacity(cpfs.len());

    for input in cpfs {
        let valid = validate_cpf(input);
        let parsed = Cpf::parse(input).ok();
        if !valid {
            invalid.push(input.clone());
        }

        if json_mode {
            results.push(serde_json::json!({
                "input": input,
                "digits": cpf_digits(input),
                "valid": valid,
                "formatted": parsed.as_ref().map(Cpf::formatted),
                "repeated": parsed.as_ref().is_some_and(Cpf::is_repeated_sequence),
            }));
            continue;
        }

        match parsed {
            Some(cpf) if cpf.is_repeated_sequence() => {
                println!("{input}: valid checksum, repeated digits ({})", cpf.formatted());
            }
            Some(cpf) => println!("{input}: valid ({})", cpf.formatted()),
            None => println!("{input}: INVALID"),
        }
    }

    if json_mode {
        print_json(&serde_json::Value::Array(results));
    }

    if invalid.is_empty() {
        Ok(())
    } else {
        Err(CadastroError::InvalidCpf(invalid.join(", ")))
    }
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Check the backend connection.
pub async fn cmd_check(config: &Config, json_mode: bool) -> Result<(), CadastroError> {
    let service = config.build_service()?;
    let connected = service.check_connection().await;

    if json_mode {
        print_json(&serde_json::json!({
            "backend": config.backend.kind.to_string(),
            "connected": connected,
        }));
    } else {
        println!("COMESOL Backend Status");
        println!("======================");
        println!("Backend:   {}", config.backend.kind);
        println!(
            "Connected: {}",
            if connected { "yes" } else { "NO" }
        );
    }

    if connected {
        Ok(())
    } else {
        Err(CadastroError::Unavailable(format!(
            "{} backend did not answer",
            config.backend.kind
        )))
    }
}

// =============================================================================
// LOGIN COMMAND
// =============================================================================

/// Sign in and show where the user would land.
pub async fn cmd_login(
    config: &Config,
    email: &str,
    password: &str,
    json_mode: bool,
) -> Result<(), CadastroError> {
    let service = config.build_service()?;
    report_login(&service, email, password, json_mode).await
}

async fn report_login(
    service: &RegistrationService,
    email: &str,
    password: &str,
    json_mode: bool,
) -> Result<(), CadastroError> {
    let outcome = service.login(email, password).await?;
    sign_out(service, &outcome.session.access_token).await;

    if json_mode {
        print_json(&serde_json::json!({
            "user_id": outcome.session.user.id,
            "email": outcome.session.user.email,
            "decision": outcome.decision,
        }));
    } else {
        println!("Signed in as {}", outcome.session.user.id);
        match &outcome.decision {
            RouteDecision::Navigate { destination } => println!("Destination: {destination}"),
            RouteDecision::LookupFailed { reason } => {
                println!("Could not check for a registered group: {reason}");
                println!("Try again later.");
            }
        }
    }

    match outcome.decision {
        RouteDecision::Navigate { .. } => Ok(()),
        RouteDecision::LookupFailed { reason } => Err(CadastroError::LookupFailed(reason)),
    }
}

// =============================================================================
// VIEW COMMAND
// =============================================================================

/// Sign in and print the saved registration.
pub async fn cmd_view(
    config: &Config,
    email: &str,
    password: &str,
    json_mode: bool,
) -> Result<(), CadastroError> {
    let service = config.build_service()?;
    report_view(&service, email, password, json_mode).await
}

async fn report_view(
    service: &RegistrationService,
    email: &str,
    password: &str,
    json_mode: bool,
) -> Result<(), CadastroError> {
    let view = signed_in_view(service, email, password).await?;

    let (group, members) = match view {
        ViewOutcome::Loaded { group, members } => (group, members),
        ViewOutcome::Redirect(RouteDecision::Navigate { .. }) => {
            if json_mode {
                print_json(&serde_json::json!({ "group": null, "members": [] }));
            } else {
                println!("No group registered yet.");
            }
            return Ok(());
        }
        ViewOutcome::Redirect(RouteDecision::LookupFailed { reason }) => {
            return Err(CadastroError::LookupFailed(reason));
        }
    };

    if json_mode {
        print_json(&serde_json::json!({ "group": group, "members": members }));
        return Ok(());
    }

    println!("{}", group.name);
    println!("{}", "=".repeat(group.name.chars().count()));
    println!("Representative: {}", group.representative_name);
    println!("Contact:        {}", group.contact_email);
    match &group.address {
        Some(address) if group.has_headquarters => println!(
            "Headquarters:   {} {}",
            address.address_line.as_deref().unwrap_or("-"),
            address.cep.as_deref().unwrap_or("")
        ),
        _ => println!("Headquarters:   no"),
    }
    if let Some(updated) = &group.updated_at {
        println!("Last saved:     {updated}");
    }
    println!();
    println!("Members ({}):", members.len());
    for member in &members {
        println!("  {}", describe_member(member));
    }
    Ok(())
}

/// Sign in, load the view, and sign out again whatever the view returned.
async fn signed_in_view(
    service: &RegistrationService,
    email: &str,
    password: &str,
) -> Result<ViewOutcome, CadastroError> {
    let outcome = service.login(email, password).await?;
    let token = outcome.session.access_token;
    let view = service.load_view(Some(&token)).await;
    sign_out(service, &token).await;
    view
}

/// Each command signs in for one call; never leave that session open.
async fn sign_out(service: &RegistrationService, token: &str) {
    if let Err(e) = service.logout(Some(token)).await {
        tracing::warn!(error = %e, "sign-out failed");
    }
}

fn describe_member(member: &Member) -> String {
    let cpf = Cpf::parse(&member.data.cpf)
        .map(|c| c.formatted())
        .unwrap_or_else(|_| member.data.cpf.clone());
    let mut line = format!("[{}] {} - CPF {}", member.id, member.data.full_name, cpf);
    if let Some(role) = member.data.role_in_group.as_deref() {
        line.push_str(&format!(" - {role}"));
    }
    line
}

// =============================================================================
// TESTS
// =============================================================================
