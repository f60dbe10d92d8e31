// CLI argument parsing and definitions

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "devenv")]
#[command(about = "Define services and projects, and run them as one local environment")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectSubcommand,
    },
    /// Manage services
    Service {
        #[command(subcommand)]
        command: ServiceSubcommand,
    },
    /// Generate and manage the compose document
    Config {
        #[command(subcommand)]
        command: ConfigSubcommand,
    },
    /// Start, stop and inspect the environment
    Env {
        #[command(subcommand)]
        command: EnvSubcommand,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ProjectSubcommand {
    /// List projects
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Create a project
    Add {
        name: String,
        /// Project environment variable (KEY=VALUE), repeatable
        #[arg(short, long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,
    },
    /// Replace a project's environment variables
    Update {
        name: String,
        #[arg(short, long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,
    },
    /// Rename a project
    Rename { name: String, new_name: String },
    /// Remove a project
    Remove { name: String },
    /// Attach a service to a project
    Attach { project: String, service: String },
    /// Detach a service from a project
    Detach { project: String, service: String },
}

#[derive(Debug, Clone, ClapArgs)]
pub struct ServiceSpec {
    pub name: String,
    /// Container image reference
    #[arg(long)]
    pub image: String,
    /// Port mapping (host:container), repeatable
    #[arg(short, long = "port", value_name = "HOST:CONTAINER")]
    pub ports: Vec<String>,
    /// Volume mapping (source:target), repeatable
    #[arg(short, long = "volume", value_name = "SOURCE:TARGET")]
    pub volumes: Vec<String>,
    /// Service that must start first, repeatable
    #[arg(short, long = "depends-on", value_name = "SERVICE")]
    pub depends_on: Vec<String>,
    /// Environment variable (KEY=VALUE), repeatable
    #[arg(short, long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,
    /// Make the service available to every project
    #[arg(short, long)]
    pub global: bool,
    /// Route <name>.<base_domain> to this container port
    #[arg(long)]
    pub proxy_port: Option<u16>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ServiceSubcommand {
    /// List services
    List {
        #[arg(long)]
        json: bool,
    },
    /// Define a service
    Add(ServiceSpec),
    /// Replace a service definition (everything but the name)
    Update(ServiceSpec),
    /// Remove a service
    Remove { name: String },
    /// List predefined services
    Catalog {
        #[arg(long)]
        json: bool,
    },
    /// Add a predefined service by name
    Instantiate { name: String },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigSubcommand {
    /// Print the compose document for the current state
    Generate,
    /// Generate and write the compose document
    Save,
    /// Report whether a compose document has been written
    Exists,
    /// Delete all devenv state
    Reset {
        /// Required; reset cannot be undone
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum EnvSubcommand {
    /// Start the environment
    Start,
    /// Stop the environment
    Stop,
    /// Stop then start the environment
    Restart,
    /// Show whether the environment is running
    Status,
}
