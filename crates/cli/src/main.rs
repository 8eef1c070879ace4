use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use embedctl_client::transport::serial::list_ports;
use embedctl_client::{
    PairingOutcome, RemoteController, RemoteControllerListener, create_transport_with_timeout,
    pair_with_device,
};
use embedctl_core::config::{ConnectionDescriptor, EmbedConfig};
use embedctl_core::logging::{LogLevel, LoggerBuilder};
use embedctl_core::menu::{MenuItem, MenuTree, MenuValue};
use embedctl_core::protocol::{AckStatus, CorrelationId, DialogCommand};
use embedctl_core::remote::{AuthStatus, RemoteInformation};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Remote control for embedded menu devices", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

/// Which device to talk to
#[derive(Args, Debug, Clone)]
struct ConnectionArgs {
    /// Named connection from the configuration file
    #[arg(long)]
    connection: Option<String>,

    /// Device host for a TCP connection
    #[arg(short = 'H', long, conflicts_with_all = ["serial", "simulate"])]
    host: Option<String>,

    /// TCP port
    #[arg(short, long, default_value_t = 3333)]
    port: u16,

    /// Serial port name
    #[arg(long, conflicts_with = "simulate")]
    serial: Option<String>,

    /// Serial baud rate
    #[arg(long, default_value_t = 115_200)]
    baud: u32,

    /// Talk to the built-in simulated device
    #[arg(long)]
    simulate: bool,

    /// JSON script for the simulated device
    #[arg(long, requires = "simulate")]
    script: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List serial ports on this machine
    Ports,
    /// Connect, receive the menu and print it
    Tree {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Store the device UUID for the named connection
        #[arg(long, requires = "connection")]
        remember: bool,
    },
    /// Print connection and value changes until interrupted
    Monitor {
        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// Change an item and wait for the device to acknowledge it
    Set {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Item id
        #[arg(long)]
        id: u16,

        /// New value, in the item's textual form
        #[arg(long, conflicts_with = "delta", required_unless_present = "delta")]
        value: Option<String>,

        /// Steps to move the value by
        #[arg(long, allow_hyphen_values = true)]
        delta: Option<i32>,
    },
    /// Ask the device to trust this client
    Pair {
        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Generate default configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long, default_value = "embedctl.toml")]
        output: PathBuf,
    },
    /// List configured connections
    Connections,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, source) = match &cli.config {
        Some(config_path) => (
            EmbedConfig::load_from_file(config_path)?,
            Some(config_path.clone()),
        ),
        None => EmbedConfig::load_with_source(),
    };
    config.merge_with_env();
    config.validate()?;

    let mut logger = LoggerBuilder::from_config(config.logging.clone());
    if let Some(level) = cli.log_level {
        logger = logger.level(level);
    }
    logger.init()?;
    debug!("Configuration loaded and validated successfully");

    match &cli.command {
        Commands::Ports => {
            let ports = list_ports()?;
            if ports.is_empty() {
                println!("No serial ports found.");
            }
            for port in ports {
                println!("{port}");
            }
        }
        Commands::Tree {
            connection,
            remember,
        } => {
            let session = Session::open(&config, connection).await?;
            let tree = session.controller.tree().await?;
            let remote = session.controller.remote_info();
            println!("{remote}");
            print_tree(&tree);

            if let Some(name) = connection.connection.as_ref().filter(|_| *remember) {
                let path = match &source {
                    Some(path) => path.clone(),
                    None => EmbedConfig::user_config_path()
                        .context("No user configuration directory")?,
                };
                EmbedConfig::remember_remote_uuid_in_file(&path, name, remote.uuid)?;
                println!("Saved device UUID {} to {}", remote.uuid, path.display());
            }
            session.close().await;
        }
        Commands::Monitor { connection } => {
            let descriptor = resolve_connection(&config, connection)?;
            let transport =
                create_transport_with_timeout(&descriptor, config.controller.connect_timeout())?;
            let controller = RemoteController::new(
                transport,
                config.controller.clone(),
                config.identity.local_identity(),
                descriptor.remote_uuid,
            )?;
            controller.add_listener(Arc::new(PrintingListener))?;
            controller.start()?;
            info!("Monitoring {}, press Ctrl-C to stop", descriptor);

            tokio::signal::ctrl_c().await?;
            controller.stop().await?;
        }
        Commands::Set {
            connection,
            id,
            value,
            delta,
        } => {
            let mut session = Session::open(&config, connection).await?;
            let correlation = match (value, delta) {
                (Some(text), _) => {
                    let tree = session.controller.tree().await?;
                    let item = tree
                        .get_menu_by_id(*id)
                        .with_context(|| format!("No item with id {id}"))?;
                    let value = MenuValue::parse_for(&item.kind, text).with_context(|| {
                        format!("'{text}' is not a valid {} value", item.kind.name())
                    })?;
                    session.controller.send_absolute_change(*id, value).await?
                }
                (None, Some(delta)) => session.controller.send_delta_change(*id, *delta).await?,
                (None, None) => bail!("Either --value or --delta is required"),
            };

            let status = session
                .wait_for_ack(correlation, config.controller.ack_timeout())
                .await?;
            println!("Device answered {status}");
            if let Some(value) = session.controller.value_of(*id).await? {
                println!("Item {id} is now {value}");
            }
            session.close().await;
        }
        Commands::Pair { connection } => {
            let descriptor = resolve_connection(&config, connection)?;
            let transport =
                create_transport_with_timeout(&descriptor, config.controller.connect_timeout())?;
            let identity = config.identity.local_identity();
            match pair_with_device(transport, &identity, config.controller.pairing_timeout())
                .await?
            {
                PairingOutcome::Paired => println!("Paired with {} as {}", descriptor, identity.name),
                PairingOutcome::Rejected => bail!("{} rejected the pairing request", descriptor),
            }
        }
        Commands::Config { action } => handle_config_command(action, &config)?,
    }

    Ok(())
}

/// Pick the connection from the command line, falling back to the configuration
fn resolve_connection(config: &EmbedConfig, args: &ConnectionArgs) -> Result<ConnectionDescriptor> {
    let descriptor = if args.simulate {
        ConnectionDescriptor::simulator("simulator", args.script.clone())
    } else if let Some(host) = &args.host {
        ConnectionDescriptor::socket(host.clone(), host.clone(), args.port)
    } else if let Some(port) = &args.serial {
        ConnectionDescriptor::serial(port.clone(), port.clone(), args.baud)
    } else if let Some(name) = &args.connection {
        config.connection(name)?.clone()
    } else if let Some(first) = config.connections.first() {
        first.clone()
    } else {
        bail!("No connection given; use --connection, --host, --serial or --simulate");
    };
    descriptor.validate()?;
    Ok(descriptor)
}

/// A controller that has reached `ConnectionReady`
struct Session {
    controller: RemoteController,
    acks: mpsc::UnboundedReceiver<(CorrelationId, AckStatus)>,
}

impl Session {
    async fn open(config: &EmbedConfig, args: &ConnectionArgs) -> Result<Self> {
        let descriptor = resolve_connection(config, args)?;
        let transport =
            create_transport_with_timeout(&descriptor, config.controller.connect_timeout())?;
        let controller = RemoteController::new(
            transport,
            config.controller.clone(),
            config.identity.local_identity(),
            descriptor.remote_uuid,
        )?;

        let (ack_tx, acks) = mpsc::unbounded_channel();
        controller.add_listener(Arc::new(AckForwarder { acks: ack_tx }))?;
        controller.start()?;

        info!("Connecting to {}", descriptor);
        let limit = config.controller.connect_timeout() + config.controller.heartbeat_timeout();
        let status = controller
            .wait_for_status(
                |s| matches!(s, AuthStatus::ConnectionReady | AuthStatus::FailedAuth),
                limit,
            )
            .await
            .with_context(|| format!("{descriptor} did not become ready"))?;
        if status == AuthStatus::FailedAuth {
            controller.shutdown();
            bail!("{descriptor} does not trust this client yet, run `embedctl pair` first");
        }
        Ok(Self { controller, acks })
    }

    async fn wait_for_ack(&mut self, correlation: CorrelationId, limit: Duration) -> Result<AckStatus> {
        let wait = async {
            while let Some((id, status)) = self.acks.recv().await {
                if id == correlation {
                    return Some(status);
                }
            }
            None
        };
        match tokio::time::timeout(limit, wait).await {
            Ok(Some(status)) => Ok(status),
            Ok(None) => bail!("Controller stopped before the acknowledgement arrived"),
            Err(_) => bail!("No acknowledgement for {correlation} within {limit:?}"),
        }
    }

    async fn close(self) {
        if let Err(e) = self.controller.stop().await {
            warn!("Error while disconnecting: {}", e);
        }
        self.controller.shutdown();
    }
}

struct AckForwarder {
    acks: mpsc::UnboundedSender<(CorrelationId, AckStatus)>,
}

impl RemoteControllerListener for AckForwarder {
    fn ack_received(&self, correlation: CorrelationId, _item: Option<&MenuItem>, status: AckStatus) {
        let _ = self.acks.send((correlation, status));
    }
}

struct PrintingListener;

impl RemoteControllerListener for PrintingListener {
    fn connection_state(&self, remote: &RemoteInformation, status: AuthStatus) {
        match status {
            AuthStatus::ConnectionReady => println!("[{status}] {remote}"),
            _ => println!("[{status}]"),
        }
    }

    fn menu_item_changed(&self, item: &MenuItem, value_only: bool) {
        if value_only {
            println!("{} ({}) changed", item.name, item.id);
        }
    }

    fn tree_fully_populated(&self) {
        println!("Menu received");
    }

    fn ack_received(&self, correlation: CorrelationId, item: Option<&MenuItem>, status: AckStatus) {
        let target = item.map(|i| i.name.as_str()).unwrap_or("dialog");
        println!("{target}: {status} ({correlation})");
    }

    fn dialog_update(&self, dialog: &DialogCommand) {
        println!("Dialog {:?}: {} - {}", dialog.mode, dialog.header, dialog.message);
    }

    fn remote_uuid_mismatch(&self, expected: Uuid, actual: Uuid) {
        println!("Warning: expected device {expected} but {actual} answered");
    }
}

fn print_tree(tree: &MenuTree) {
    if tree.is_empty() {
        println!("(empty menu)");
        return;
    }
    tree.walk(|depth, item| {
        let indent = "  ".repeat(depth + 1);
        let flags = if item.read_only { " [ro]" } else { "" };
        if item.is_sub_menu() {
            println!("{indent}{} ({}){flags}", item.name, item.id);
        } else {
            let value = tree
                .value_of(item.id)
                .map(|v| v.to_string())
                .unwrap_or_default();
            println!(
                "{indent}{} ({}, {}) = {value}{flags}",
                item.name,
                item.id,
                item.kind.name()
            );
        }
    });
}

fn handle_config_command(action: &ConfigAction, config: &EmbedConfig) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("Current Configuration:");
            println!("{}", toml::to_string_pretty(config)?);
        }
        ConfigAction::Init { output } => {
            let default_config = EmbedConfig::default();
            default_config.save_to_file(output)?;
            println!("Default configuration saved to: {}", output.display());
        }
        ConfigAction::Connections => {
            if config.connections.is_empty() {
                println!("No connections configured.");
            } else {
                println!("Configured connections:");
                for connection in &config.connections {
                    let uuid = connection
                        .remote_uuid
                        .map(|u| format!(" device {u}"))
                        .unwrap_or_default();
                    println!("  {connection}{uuid}");
                }
            }
        }
    }
    Ok(())
}
