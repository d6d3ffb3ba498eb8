//! Command line and environment configuration.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use clap::Parser;
use fsmapper::config::{DEFAULT_COMPONENTS_FILE, DEFAULT_DOCUMENT, MODULE_ROOT_ENV};
use fsmapper::error::resolve_against;
use fsmapper::explore::DEFAULT_MAX_DEPTH;
use fsmapper::{ComponentTable, MapperConfig};

use crate::error::{ServerError, ServerResult};

pub const DEFAULT_PORT: u16 = 7777;

/// Environment configurations live below `<cwd>/../env/etcui/<name>`.
const ETC_BASE: &str = "../env/etcui";

#[derive(Debug, Clone, Parser)]
#[command(name = "devserver", version, about = "Serve a merged module namespace for development")]
pub struct Args {
    /// Document root directory. Overrides a `www` component entry.
    pub www: Option<PathBuf>,

    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Environment configuration served under `/etc`.
    #[arg(short = 'e', long)]
    pub etc: Option<String>,

    /// Component table, relative to the working directory.
    #[arg(long, default_value = DEFAULT_COMPONENTS_FILE)]
    pub components: PathBuf,

    #[arg(long, env = MODULE_ROOT_ENV)]
    pub thoregon_root: Option<PathBuf>,

    #[arg(long, default_value = "127.0.0.1")]
    pub bind: IpAddr,

    #[arg(long, default_value = DEFAULT_DOCUMENT)]
    pub default_document: String,

    /// Deepest directory level explored or crawled.
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,
}

/// Resolved server configuration.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    pub working_dir: PathBuf,
    pub addr: SocketAddr,
    pub document_root: Option<PathBuf>,
    pub components_file: PathBuf,
    pub module_root: Option<PathBuf>,
    pub etc_dir: Option<PathBuf>,
    pub default_document: String,
    pub max_depth: usize,
}

impl DevServerConfig {
    /// Loads `.env`, parses the command line and resolves paths against the
    /// current directory.
    pub fn load() -> ServerResult<Self> {
        if let Err(error) = dotenvy::dotenv() {
            if !error.not_found() {
                return Err(ServerError::Config(format!("failed to read .env: {error}")));
            }
        }
        let working_dir = std::env::current_dir()
            .map_err(|error| ServerError::Config(format!("no working directory: {error}")))?;
        Ok(Self::from_args(Args::parse(), &working_dir))
    }

    pub fn from_args(args: Args, working_dir: &Path) -> Self {
        let etc_dir = args.etc.as_deref().map(|etc| {
            let base = resolve_against(working_dir, Path::new(ETC_BASE));
            base.join(etc.trim_start_matches('/'))
        });
        Self {
            working_dir: working_dir.to_path_buf(),
            addr: SocketAddr::new(args.bind, args.port),
            document_root: args.www,
            components_file: resolve_against(working_dir, &args.components),
            module_root: args.thoregon_root,
            etc_dir,
            default_document: args.default_document,
            max_depth: args.max_depth,
        }
    }

    /// Configuration for a local server on `working_dir` with an
    /// ephemeral port and defaults otherwise.
    pub fn local(working_dir: impl Into<PathBuf>) -> Self {
        let working_dir = working_dir.into();
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            document_root: None,
            components_file: working_dir.join(DEFAULT_COMPONENTS_FILE),
            module_root: None,
            etc_dir: None,
            default_document: DEFAULT_DOCUMENT.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            working_dir,
        }
    }

    /// Builds the namespace configuration. A missing or malformed component
    /// table leaves the namespace without components.
    pub fn mapper_config(&self) -> MapperConfig {
        let components = ComponentTable::load_or_default(&self.components_file);
        let mut config = MapperConfig::new(&self.working_dir)
            .with_components(components)
            .with_default_document(self.default_document.clone())
            .with_max_depth(self.max_depth);
        if let Some(root) = &self.module_root {
            config = config.with_module_root(root);
        }
        if let Some(root) = &self.document_root {
            config = config.with_document_root(root);
        }
        config
    }
}
