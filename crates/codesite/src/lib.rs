//! # CodeSite - Render Block-Based Pages
//!
//! Command-line front end for [`codesite_render`]. A site fixture (YAML or
//! JSON) holds settings, blocks, layouts, templates and overrides; a request
//! file describes what is being viewed.
//!
//! ```text
//! codesite render --site site.yaml --request post.yaml > page.html
//! codesite render --site site.yaml --fragment
//! codesite resolve --site site.yaml --request post.yaml
//! codesite scope hero.css --prefix codesite-block-7
//! codesite minify theme.css
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (`RUST_LOG=codesite_render=debug` shows skipped references and template
//! choices).

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use codesite_render::css;
use codesite_render::{
    EntityStore, MemoryStore, RenderContext, RenderPipeline, RequestEnvironment, TemplateLogic,
};
use tracing::debug;

pub mod shell;

/// Render block-based pages from a site fixture.
#[derive(Debug, Parser)]
#[command(name = "codesite", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render a request to HTML
    Render(RenderArgs),
    /// Print the template (and override) a request resolves to
    Resolve(RequestArgs),
    /// Scope a stylesheet under a class prefix
    Scope {
        /// Stylesheet path, or `-` for stdin
        input: PathBuf,
        /// Class the rules are confined to, e.g. `codesite-block-7`
        #[arg(short, long)]
        prefix: String,
        /// Minify the scoped output
        #[arg(long)]
        minify: bool,
    },
    /// Minify a stylesheet
    Minify {
        /// Stylesheet path, or `-` for stdin
        input: PathBuf,
    },
}

/// Where the site and the request come from.
#[derive(Debug, Args)]
pub struct RequestArgs {
    /// Site fixture (YAML or JSON)
    #[arg(short, long)]
    pub site: PathBuf,
    /// Request environment (YAML or JSON); defaults to the home page
    #[arg(short, long)]
    pub request: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub source: RequestArgs,
    /// Print only the body markup, without the document shell or assets
    #[arg(long)]
    pub fragment: bool,
    /// Render even when the site would not take over the request
    #[arg(long)]
    pub force: bool,
}

/// Runs a parsed command, writing its output to `out`.
pub fn run(cli: Cli, out: &mut dyn Write) -> Result<()> {
    match cli.command {
        Command::Render(args) => render(&args, out),
        Command::Resolve(args) => resolve(&args, out),
        Command::Scope {
            input,
            prefix,
            minify,
        } => {
            let source = read_input(&input)?;
            let scoped = css::scope(&source, &prefix);
            let scoped = if minify { css::minify(&scoped) } else { scoped };
            writeln!(out, "{}", scoped)?;
            Ok(())
        }
        Command::Minify { input } => {
            let source = read_input(&input)?;
            writeln!(out, "{}", css::minify(&source))?;
            Ok(())
        }
    }
}

fn render(args: &RenderArgs, out: &mut dyn Write) -> Result<()> {
    let (store, env) = load(&args.source)?;
    let pipeline = pipeline(store);
    if !args.force && !pipeline.should_render(&env) {
        bail!("the site does not take over this request; pass --force to render it anyway");
    }
    if args.fragment {
        let mut ctx = RenderContext::new();
        let html = pipeline.render_current_request(&env, &mut ctx);
        writeln!(out, "{}", html)?;
    } else {
        let page = pipeline.render_page(&env);
        write!(out, "{}", shell::page(&page, &env))?;
    }
    Ok(())
}

fn resolve(args: &RequestArgs, out: &mut dyn Write) -> Result<()> {
    let (store, env) = load(args)?;
    let pipeline = pipeline(store);
    if let Some(ov) = pipeline.find_override(&env) {
        writeln!(
            out,
            "override: post {} ({})",
            ov.post_id, ov.override_type
        )?;
    }
    let Some(template_type) = pipeline.classify(&env) else {
        writeln!(out, "request has no template type")?;
        return Ok(());
    };
    match pipeline.resolve_template(&env) {
        Some(template) => writeln!(
            out,
            "{}: template {} \"{}\" (priority {})",
            template_type, template.id, template.name, template.priority
        )?,
        None => writeln!(out, "{}: no template", template_type)?,
    }
    Ok(())
}

fn pipeline(store: MemoryStore) -> RenderPipeline<MemoryStore> {
    let template_logic = store.settings().template_logic;
    let pipeline = RenderPipeline::new(store);
    if template_logic {
        pipeline.with_transformer(TemplateLogic::new())
    } else {
        pipeline
    }
}

fn load(args: &RequestArgs) -> Result<(MemoryStore, RequestEnvironment)> {
    let store = MemoryStore::from_path(&args.site)
        .with_context(|| format!("failed to load site fixture {}", args.site.display()))?;
    let env = match &args.request {
        Some(path) => {
            let source = read_input(path)?;
            RequestEnvironment::from_yaml(&source)
                .with_context(|| format!("failed to parse request {}", path.display()))?
        }
        None => RequestEnvironment::default(),
    };
    debug!(kind = ?env.kind, post = ?env.post_id(), "request loaded");
    Ok((store, env))
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("failed to read stdin")?;
        return Ok(source);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
