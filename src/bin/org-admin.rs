//! Organization administration CLI
//!
//! Demonstration front end for the privileged-action core, wired to
//! scripted in-process services.

use anyhow::Result;
use clap::{Parser, Subcommand};
use org_admin::console::{
    ConsoleEventLog, ConsoleNavigator, ConsoleNotifier, TerminalConfirmationPrompt,
    TerminalCredentialPrompt,
};
use org_admin::core::config::AdminConfig;
use org_admin::core::interaction::OperatorOutcome;
use org_admin::core::traits::{
    Address, AddressKind, Member, MemberId, Organization, OrgPrivateKey, Role,
};
use org_admin::orchestration::{
    OperatorContext, OrganizationView, PrivilegedActionExecutor, Services,
};
use org_admin::testing::{DigestKeyCrypto, LocalContextLauncher, ScriptedDirectory, ScriptedOrganizationService};
use secrecy::SecretString;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Organization member administration
#[derive(Parser)]
#[command(name = "org-admin")]
#[command(version = "0.1.0")]
#[command(about = "Organization member administration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the organization and its members
    Show,

    /// Change a member's role
    ChangeRole {
        /// Member identifier
        #[arg(value_name = "MEMBER_ID")]
        member_id: u64,

        /// New role (admin|member)
        #[arg(value_name = "ROLE")]
        role: String,
    },

    /// Switch a member to private (permanent)
    Privatize {
        /// Member identifier
        #[arg(value_name = "MEMBER_ID")]
        member_id: u64,
    },

    /// Remove a member from the organization
    Delete {
        /// Member identifier
        #[arg(value_name = "MEMBER_ID")]
        member_id: u64,
    },

    /// Rotate the organization key recovery password
    RotateRecovery {
        /// New recovery password
        #[arg(value_name = "NEW_PASSWORD")]
        new_password: String,

        /// Confirmation of the new recovery password
        #[arg(value_name = "CONFIRM_PASSWORD")]
        confirm_password: String,
    },

    /// Log in to a member account in a new session
    LoginAs {
        /// Member identifier
        #[arg(value_name = "MEMBER_ID")]
        member_id: u64,
    },

    /// Update the organization display name
    SetName {
        /// New display name
        #[arg(value_name = "NAME")]
        name: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match run().await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\n❌ Error");
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

fn demo_view() -> OrganizationView {
    let organization = Organization {
        display_name: "Acme".to_string(),
        used_members: 3,
        used_addresses: 5,
        key_status: 0,
    };
    let members = vec![
        Member {
            id: MemberId(1),
            name: "alice".to_string(),
            role: Role::Admin,
            private: false,
            addresses: vec![Address::new("alice@acme.test", AddressKind::Primary)],
        },
        Member {
            id: MemberId(2),
            name: "bob".to_string(),
            role: Role::Member,
            private: false,
            addresses: vec![
                Address::new("bob@acme.test", AddressKind::Primary),
                Address::new("b@acme.test", AddressKind::Alias),
            ],
        },
        Member {
            id: MemberId(3),
            name: "carol".to_string(),
            role: Role::Member,
            private: true,
            addresses: vec![
                Address::new("carol@acme.test", AddressKind::Primary),
                Address::new("carol.ops@acme.test", AddressKind::Alias),
            ],
        },
    ];
    OrganizationView::new(organization, members, OrgPrivateKey::new("demo-org-key"))
}

fn demo_executor(config: AdminConfig) -> PrivilegedActionExecutor {
    let services = Services {
        directory: Arc::new(ScriptedDirectory::new()),
        organization: Arc::new(ScriptedOrganizationService::new()),
        key_crypto: Arc::new(DigestKeyCrypto::new()),
        event_log: Arc::new(ConsoleEventLog),
        navigator: Arc::new(ConsoleNavigator),
        notifier: Arc::new(ConsoleNotifier),
    };

    PrivilegedActionExecutor::new(
        demo_view(),
        config,
        services,
        Arc::new(TerminalCredentialPrompt),
        Arc::new(TerminalConfirmationPrompt),
    )
}

fn demo_operator() -> OperatorContext {
    OperatorContext {
        href: "https://org-admin.localhost/settings/members".to_string(),
        unlock_secret: SecretString::from("demo-unlock-secret"),
        has_second_factor: false,
    }
}

fn parse_role(role: &str) -> Result<Role> {
    match role {
        "admin" => Ok(Role::Admin),
        "member" => Ok(Role::Member),
        other => anyhow::bail!("unknown role '{}' (expected admin or member)", other),
    }
}

fn show(executor: &PrivilegedActionExecutor) {
    let organization = executor.view().organization();
    println!("\n🏢 {}", organization.display_name);
    println!(
        "   members: {}  addresses: {}",
        organization.used_members, organization.used_addresses
    );

    for member in executor.view().members() {
        let role = match member.role {
            Role::Admin => "admin",
            Role::Member => "member",
        };
        let private = if member.private { " (private)" } else { "" };
        println!("   [{}] {} — {}{}", member.id, member.name, role, private);
        for address in &member.addresses {
            println!("       {}", address.email);
        }
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = AdminConfig::load(".").await?;
    let mut executor = demo_executor(config);

    match cli.command {
        Commands::Show => {
            show(&executor);
            Ok(0)
        }
        Commands::ChangeRole { member_id, role } => {
            let role = parse_role(&role)?;
            let result = executor
                .change_role(MemberId(member_id), role)
                .await
                .and_then(OperatorOutcome::ok_or_cancelled);
            match result {
                Ok(()) => Ok(0),
                Err(e) if e.is_silent() => Ok(0),
                Err(_) => Ok(1),
            }
        }
        Commands::Privatize { member_id } => {
            let result = executor
                .privatize(MemberId(member_id))
                .await
                .and_then(OperatorOutcome::ok_or_cancelled);
            match result {
                Ok(()) => Ok(0),
                Err(e) if e.is_silent() => Ok(0),
                Err(_) => Ok(1),
            }
        }
        Commands::Delete { member_id } => {
            let result = executor
                .delete(MemberId(member_id))
                .await
                .and_then(OperatorOutcome::ok_or_cancelled);
            match result {
                Ok(()) => Ok(0),
                Err(e) if e.is_silent() => Ok(0),
                Err(_) => Ok(1),
            }
        }
        Commands::RotateRecovery {
            new_password,
            confirm_password,
        } => {
            executor
                .view_mut()
                .recovery_form_mut()
                .enter(&new_password, &confirm_password);
            let result = executor
                .rotate_recovery_password(&demo_operator())
                .await
                .and_then(OperatorOutcome::ok_or_cancelled);
            match result {
                Ok(()) => Ok(0),
                Err(e) if e.is_silent() => Ok(0),
                Err(_) => Ok(1),
            }
        }
        Commands::LoginAs { member_id } => {
            let launcher = LocalContextLauncher::new();
            let result = executor
                .login_as(MemberId(member_id), &demo_operator(), &launcher)
                .await
                .and_then(OperatorOutcome::ok_or_cancelled);
            match result {
                Ok(_state) => {
                    println!("✅ Session handed off to the new context");
                    Ok(0)
                }
                Err(e) if e.is_silent() => Ok(0),
                Err(_) => Ok(1),
            }
        }
        Commands::SetName { name } => match executor.update_display_name(&name).await {
            Ok(()) => Ok(0),
            Err(_) => Ok(1),
        },
    }
}
