use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use scribe_convert::FrontMatter;

mod config;
mod files;
mod page;

use page::{CreatePageRequest, Page, PagesResponse, SpacesResponse, UpdatePageRequest};

#[derive(Parser)]
#[command(
    name = "scribe",
    version,
    about = "Convert Markdown to and from a wiki's storage format"
)]
struct Cli {
    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log conversion details to stderr (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert Markdown to storage format
    Encode {
        /// Markdown file (default: stdin)
        file: Option<String>,

        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<String>,
    },

    /// Convert storage format to Markdown
    Decode {
        /// Storage-format file (default: stdin)
        file: Option<String>,

        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<String>,
    },

    /// Build request bodies for the page REST API, or read its responses
    Page {
        #[command(subcommand)]
        action: PageCommand,
    },

    /// List the wiki's spaces
    Spaces {
        #[command(subcommand)]
        action: SpacesCommand,
    },

    /// Print the resolved configuration
    Config,
}

#[derive(Subcommand)]
enum SpacesCommand {
    /// Print the URL that lists spaces, or list a fetched response
    List {
        /// Maximum number of spaces per request
        #[arg(long, default_value_t = 50)]
        limit: u32,

        /// Index of the first space to return
        #[arg(long, default_value_t = 0)]
        offset: u32,

        /// Fetched response JSON to list as id, key and name (`-` for stdin)
        #[arg(long)]
        results: Option<String>,
    },
}

#[derive(Subcommand)]
enum PageCommand {
    /// Print the JSON body for creating a page from a Markdown file
    Create {
        /// Markdown file to publish
        #[arg(long)]
        file: String,

        /// Page title (default: front matter `title`)
        #[arg(long)]
        title: Option<String>,

        /// Space key (default: front matter, then config)
        #[arg(long)]
        space: Option<String>,

        /// Parent page id (default: front matter, then config)
        #[arg(long)]
        parent: Option<String>,
    },

    /// Print the JSON body for updating an existing page
    Update {
        /// Markdown file with the new content
        #[arg(long)]
        file: String,

        /// The current page as returned by the server (needs `version`)
        #[arg(long)]
        current: String,

        /// New title (default: front matter, then the current title)
        #[arg(long)]
        title: Option<String>,
    },

    /// Print the URL that searches a space's pages, or list a fetched response
    Search {
        /// Space key (default: config)
        #[arg(long)]
        space: Option<String>,

        /// Maximum number of pages per request
        #[arg(long, default_value_t = 100)]
        limit: u32,

        /// Index of the first page to return
        #[arg(long, default_value_t = 0)]
        offset: u32,

        /// Fetched response JSON to list as id, space and title (`-` for stdin)
        #[arg(long)]
        results: Option<String>,
    },

    /// Print a fetched page's body as Markdown
    Show {
        /// Page JSON with `body.storage` expanded (default: stdin)
        page: Option<String>,

        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Encode { file, out } => {
            let markdown = files::read_input(file.as_deref())?;
            emit(out.as_deref(), &scribe_convert::encode(&markdown), cli.quiet)?;
        }
        Commands::Decode { file, out } => {
            let storage = files::read_input(file.as_deref())?;
            emit(out.as_deref(), &scribe_convert::decode(&storage), cli.quiet)?;
        }
        Commands::Page { action } => handle_page(action, cli.quiet)?,
        Commands::Spaces { action } => handle_spaces(action, cli.quiet)?,
        Commands::Config => {
            let config = load_config()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn load_config() -> Result<config::ScribeConfig> {
    let cwd = std::env::current_dir().context("Failed to resolve the working directory")?;
    config::load_config(&cwd)
}

fn emit(out: Option<&str>, text: &str, quiet: bool) -> Result<()> {
    files::write_output(out, text)?;
    if let Some(path) = out.filter(|p| *p != "-") {
        if !quiet {
            eprintln!("{}: {}", path, "OK".green());
        }
    }
    Ok(())
}

fn handle_page(action: PageCommand, quiet: bool) -> Result<()> {
    match action {
        PageCommand::Create {
            file,
            title,
            space,
            parent,
        } => {
            let markdown = files::read_input(Some(file.as_str()))?;
            let fm = front_matter(&file, &markdown);
            let config = load_config()?;

            let Some(title) = title.or(fm.title) else {
                bail!("No title for '{}': pass --title or set `title` in its front matter", file);
            };
            let Some(space) = space.or(fm.space).or(config.space) else {
                bail!(
                    "No space for '{}': pass --space, set `space` in its front matter, or set `space` in {}",
                    file,
                    config::CONFIG_FILE
                );
            };
            let parent = parent.or(fm.parent).or(config.parent);

            let request =
                CreatePageRequest::new(title, space, parent, scribe_convert::encode(&markdown));
            println!("{}", serde_json::to_string_pretty(&request)?);
        }
        PageCommand::Update {
            file,
            current,
            title,
        } => {
            let markdown = files::read_input(Some(file.as_str()))?;
            let fm = front_matter(&file, &markdown);
            let page = read_page(Some(current.as_str()))?;

            let title = title.or(fm.title).unwrap_or_else(|| page.title.clone());
            let request =
                UpdatePageRequest::next_version(&page, title, scribe_convert::encode(&markdown))?;
            if !quiet {
                eprintln!(
                    "{}: version {} -> {}",
                    page.id,
                    page.version.as_ref().map_or(0, |v| v.number),
                    request.version.number.to_string().green()
                );
            }
            println!("{}", serde_json::to_string_pretty(&request)?);
        }
        PageCommand::Search {
            space,
            limit,
            offset,
            results,
        } => {
            if let Some(results) = results {
                let response: PagesResponse = read_json(&results)?;
                for page in &response.results {
                    let space = page.space.as_ref().map_or("-", |s| s.key.as_str());
                    println!("{}\t{}\t{}", page.id, space, page.title);
                }
                if !quiet {
                    eprintln!("{} pages", response.results.len().to_string().green());
                }
                return Ok(());
            }
            let config = load_config()?;
            let Some(space) = space.or(config.space) else {
                bail!(
                    "No space to search: pass --space or set `space` in {}",
                    config::CONFIG_FILE
                );
            };
            println!(
                "{}",
                page::search_endpoint(&config.base_url, &space, limit, offset)?
            );
        }
        PageCommand::Show { page, out } => {
            let page = read_page(page.as_deref())?;
            let Some(storage) = page.storage() else {
                bail!(
                    "Page {} has no body; fetch it with expand=body.storage",
                    page.id
                );
            };
            log::debug!("page {} '{}': {} bytes of storage", page.id, page.title, storage.len());
            emit(out.as_deref(), &scribe_convert::decode(storage), quiet)?;
            if !quiet {
                if let Some(url) = page.web_url(&load_config()?.base_url) {
                    eprintln!("{}: {}", page.title, url.cyan());
                }
            }
        }
    }

    Ok(())
}

fn handle_spaces(action: SpacesCommand, quiet: bool) -> Result<()> {
    match action {
        SpacesCommand::List {
            limit,
            offset,
            results,
        } => {
            if let Some(results) = results {
                let response: SpacesResponse = read_json(&results)?;
                for space in &response.results {
                    let id = space.id.map_or_else(|| "-".to_string(), |id| id.to_string());
                    println!("{}\t{}\t{}", id, space.key, space.name.as_deref().unwrap_or(""));
                }
                if !quiet {
                    eprintln!("{} spaces", response.results.len().to_string().green());
                }
            } else {
                let config = load_config()?;
                println!("{}", page::spaces_endpoint(&config.base_url, limit, offset));
            }
        }
    }

    Ok(())
}

/// Front matter metadata, or the default when absent. Bad YAML only warns:
/// the body still publishes.
fn front_matter(file: &str, markdown: &str) -> FrontMatter {
    match scribe_convert::parse_front_matter(markdown) {
        Ok(fm) => fm.unwrap_or_default(),
        Err(e) => {
            log::warn!("{file}: {e}");
            FrontMatter::default()
        }
    }
}

fn read_page(path: Option<&str>) -> Result<Page> {
    let raw = files::read_input(path)?;
    let source = path.unwrap_or("stdin");
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse page JSON from '{}'", source))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let raw = files::read_input(Some(path))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse response JSON from '{}'", path))
}
