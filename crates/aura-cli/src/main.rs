mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "aura",
    about = "Browse the work-item hierarchy, preview designs and generate UI code",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .aura/ or .git/)
    #[arg(long, global = true, env = "AURA_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .aura/ with a default config and empty collections
    Init,

    /// Print the portfolio → brief → initiative → feature → epic → story tree
    Tree {
        /// Open every group and node instead of the default auto-expansion
        #[arg(long)]
        expand_all: bool,
    },

    /// List one collection (initiatives, features, epics, stories, portfolios, briefs)
    List { kind: String },

    /// Add a work item
    Add {
        kind: String,
        /// Item id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Id of the parent one level up
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        brief: Option<String>,
        #[arg(long)]
        portfolio: Option<String>,
        #[arg(long)]
        priority: Option<String>,
    },

    /// Compose a previewable HTML document from a design JSON file
    Preview {
        design: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
        /// Wrap the document in a sandboxed iframe tag
        #[arg(long)]
        iframe: bool,
    },

    /// Write the markdown download bundle for a generated project JSON file
    Bundle {
        project: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
        /// Name the output after this work item (<ID>-generated-code.md)
        #[arg(long = "for", conflicts_with = "out")]
        work_item: Option<String>,
    },

    /// Generate a design for a work item, falling back to the template
    Generate {
        id: String,
        /// Reference image to attach
        #[arg(long)]
        image: Option<PathBuf>,
        /// Extra instructions appended to the prompt
        #[arg(long)]
        prompt: Option<String>,
        #[arg(long)]
        framework: Option<String>,
        /// Write the composed preview document here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Also save the design as a plain-text download
        #[arg(long)]
        download: Option<PathBuf>,
    },

    /// Generate a runnable project for a work item as a markdown bundle
    Code {
        id: String,
        /// frontend, backend or fullstack
        #[arg(long = "type", default_value = "frontend")]
        code_type: String,
        /// Target language; `auto` or `html-single` for the templates
        #[arg(long, default_value = "auto")]
        language: String,
        #[arg(long)]
        prompt: Option<String>,
        /// Bundle path (default: <id>-generated-code.md)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Run the HTTP server
    Serve {
        /// Port to listen on (default: server.port from config)
        #[arg(long)]
        port: Option<u16>,

        /// Open a browser once listening
        #[arg(long)]
        open: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root, cli.json),
        Commands::Tree { expand_all } => cmd::tree::run(&root, expand_all, cli.json),
        Commands::List { kind } => cmd::list::run(&root, &kind, cli.json),
        Commands::Add {
            kind,
            id,
            title,
            description,
            parent,
            brief,
            portfolio,
            priority,
        } => cmd::add::run(
            &root,
            &kind,
            cmd::add::AddArgs {
                id,
                title,
                description,
                parent,
                brief,
                portfolio,
                priority,
            },
            cli.json,
        ),
        Commands::Preview { design, out, iframe } => {
            cmd::preview::run(&root, &design, out.as_deref(), iframe, cli.json)
        }
        Commands::Bundle {
            project,
            out,
            work_item,
        } => cmd::bundle::run(&project, out, work_item.as_deref(), cli.json),
        Commands::Generate {
            id,
            image,
            prompt,
            framework,
            out,
            download,
        } => cmd::generate::run(
            &root,
            &id,
            cmd::generate::GenerateArgs {
                image,
                prompt,
                framework,
                out,
                download,
            },
            cli.json,
        ),
        Commands::Code {
            id,
            code_type,
            language,
            prompt,
            out,
        } => cmd::code::run(
            &root,
            &id,
            &code_type,
            &language,
            prompt.as_deref(),
            out.as_deref(),
            cli.json,
        ),
        Commands::Serve { port, open } => cmd::serve::run(&root, port, open),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
