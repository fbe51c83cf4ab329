use clap::{Parser, Subcommand};

/// Vendora — provider onboarding and marketplace admin service
#[derive(Parser)]
#[command(name = "vendora", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the admin service
    Serve {
        /// Port to bind
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage vendor applications
    Application {
        #[command(subcommand)]
        command: ApplicationCommands,
    },

    /// Manage live provider profiles
    Provider {
        #[command(subcommand)]
        command: ProviderCommands,
    },
}

#[derive(Subcommand)]
pub enum ApplicationCommands {
    /// List applications ("pending" by default; pass --status all for everything)
    List {
        #[arg(long)]
        status: Option<String>,
    },
    /// Show a single application
    Show { application_id: String },
    /// Approve a pending application (creates the provider profile)
    Approve { application_id: String },
    /// Reject a pending application
    Reject {
        application_id: String,
        /// Reviewer notes passed back to the applicant
        #[arg(long)]
        notes: String,
    },
}

#[derive(Subcommand)]
pub enum ProviderCommands {
    /// List provider profiles (active only by default)
    List {
        #[arg(long)]
        include_inactive: bool,
    },
    /// Reactivate a provider profile
    Activate { profile_id: String },
    /// Temporarily deactivate a provider profile
    Deactivate { profile_id: String },
}
