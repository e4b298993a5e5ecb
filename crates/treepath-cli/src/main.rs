//! Command-line front-end: run one XPath expression over a set of files.
//!
//! Files are typed by extension unless `-t` forces a type; `-` reads stdin.
//! Per-file errors go to stderr and processing continues, so a bad document
//! in a directory walk does not abort the run.

mod emit;

use std::collections::VecDeque;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Context as _};
use clap::{Parser, ValueEnum};
use treepath::{
    exec, read_html, read_json, read_xml, ContextSettings, Cursor, EntityMap, Grammar, Value,
    XmlOptions,
};

#[derive(Parser)]
#[command(name = "treepath", version, about = "Query XML, HTML and JSON documents with XPath 1.0")]
struct Cli {
    /// XPath expression to execute.
    #[arg(short = 'x', long = "expr")]
    expression: String,

    /// Namespace binding, repeatable: -s companyns=http://company.com
    #[arg(short = 's', long = "namespace", value_name = "PREFIX=URI")]
    namespaces: Vec<String>,

    /// Variable binding (bound as a string), repeatable: -v var=value
    #[arg(short = 'v', long = "variable", value_name = "NAME=VALUE")]
    variables: Vec<String>,

    /// XML entity binding, repeatable: -e entityname=entityval
    #[arg(short = 'e', long = "entity", value_name = "NAME=VALUE")]
    entities: Vec<String>,

    /// Recursively traverse directory arguments.
    #[arg(short = 'r', long)]
    recursive: bool,

    /// Suppress filenames in the output.
    #[arg(short = 'n', long = "no-filenames")]
    suppress_filenames: bool,

    /// Print node-set results as XML.
    #[arg(short = 'm', long = "as-xml")]
    as_xml: bool,

    /// Print the string value of every node of a node-set, not just the
    /// first.
    #[arg(short = 'a', long = "all-nodes")]
    all_nodes: bool,

    /// Number of files to process concurrently (output order is not
    /// stable above 1).
    #[arg(short = 'c', long = "concurrency", default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    concurrency: u32,

    /// Force the document type instead of detecting it by extension.
    #[arg(short = 't', long = "type", value_enum)]
    doc_type: Option<DocType>,

    /// Turn off strict XML decoding.
    #[arg(short = 'u', long = "unstrict")]
    unstrict: bool,

    /// Files to query; `-` reads stdin. Directories require -r.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DocType {
    Xml,
    Html,
    Json,
}

struct Job {
    expr: Grammar,
    settings: ContextSettings,
    xml_opts: XmlOptions,
    cli: Cli,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let expr = treepath::build_expr(&cli.expression).context("bad XPath expression")?;

    let namespaces = parse_pairs(&cli.namespaces).context("bad namespace mapping")?;
    let mut settings = ContextSettings::new();
    for (prefix, uri) in &namespaces {
        settings = settings.with_namespace(prefix.clone(), uri.clone());
    }
    for (name, value) in parse_pairs(&cli.variables).context("bad variable binding")? {
        let (space, local) = resolve_variable_name(&name, &namespaces)?;
        settings = settings.with_variable(space, local, Value::String(value));
    }

    let mut entities = EntityMap::new();
    for (name, value) in parse_pairs(&cli.entities).context("bad entity binding")? {
        entities.insert(name, value);
    }
    let xml_opts = XmlOptions {
        strict: !cli.unstrict,
        entities,
    };

    let mut files = Vec::new();
    for file in &cli.files {
        collect_files(file, cli.recursive, &mut files);
    }

    let job = Job {
        expr,
        settings,
        xml_opts,
        cli,
    };
    let queue = Mutex::new(files.into_iter().collect::<VecDeque<_>>());
    let workers = job.cli.concurrency as usize;
    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let Some(path) = queue.lock().expect("queue lock").pop_front() else {
                    break;
                };
                run_file(&job, &path);
            });
        }
    });
    Ok(())
}

/// Split repeatable `name=value` flags.
fn parse_pairs(raw: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    raw.iter()
        .map(|entry| match entry.split_once('=') {
            Some((name, value)) => Ok((name.to_string(), value.to_string())),
            None => bail!("invalid mapping {entry:?}, expected name=value"),
        })
        .collect()
}

/// Variable names may carry a prefix bound through `-s`.
fn resolve_variable_name(
    name: &str,
    namespaces: &[(String, String)],
) -> anyhow::Result<(String, String)> {
    match name.split_once(':') {
        None => Ok((String::new(), name.to_string())),
        Some((prefix, local)) => {
            let uri = namespaces
                .iter()
                .find(|(p, _)| p == prefix)
                .map(|(_, uri)| uri.clone());
            match uri {
                Some(uri) => Ok((uri, local.to_string())),
                None => bail!("unknown namespace binding '{prefix}'"),
            }
        }
    }
}

fn collect_files(path: &Path, recursive: bool, out: &mut Vec<PathBuf>) {
    if path.as_os_str() == "-" || path.is_file() {
        out.push(path.to_path_buf());
        return;
    }
    if !path.is_dir() {
        eprintln!("{}: no such file", path.display());
        return;
    }
    if !recursive {
        eprintln!("{} is a directory", path.display());
        return;
    }
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("error traversing {}: {e}", path.display());
            return;
        }
    };
    let mut children: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    children.sort();
    for child in children {
        if child.is_dir() {
            collect_files(&child, recursive, out);
        } else {
            out.push(child);
        }
    }
}

fn run_file(job: &Job, path: &Path) {
    if let Err(e) = try_run_file(job, path) {
        eprintln!("{}: {e:#}", display_name(path));
    }
}

fn try_run_file(job: &Job, path: &Path) -> anyhow::Result<()> {
    let bytes = if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("reading stdin")?;
        buf
    } else {
        fs::read(path).context("reading file")?
    };

    let cursor = parse_document(job, path, &bytes)?;
    let result = exec(&cursor, &job.expr, &job.settings).context("executing expression")?;

    let label = if job.cli.suppress_filenames || path.as_os_str() == "-" {
        None
    } else {
        Some(display_name(path))
    };

    let mut out = String::new();
    match (&result, job.cli.as_xml, job.cli.all_nodes) {
        (Value::Nodes(nodes), true, _) => {
            for node in nodes {
                let xml = emit::node_to_xml(node).context("serializing result")?;
                push_line(&mut out, label.as_deref(), &xml.replace('\n', "&#10;"));
            }
        }
        (Value::Nodes(nodes), false, true) => {
            for node in nodes {
                push_line(&mut out, label.as_deref(), &treepath::get_cursor_string(node));
            }
        }
        _ => push_line(&mut out, label.as_deref(), &result.string()),
    }

    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    lock.write_all(out.as_bytes())?;
    Ok(())
}

fn parse_document(job: &Job, path: &Path, bytes: &[u8]) -> anyhow::Result<Cursor> {
    let doc_type = job.cli.doc_type.unwrap_or_else(|| detect_type(path));
    let cursor = match doc_type {
        DocType::Xml => read_xml(bytes, job.xml_opts.clone()),
        DocType::Html => read_html(bytes),
        DocType::Json => read_json(bytes),
    };
    cursor.context("parsing document")
}

fn detect_type(path: &Path) -> DocType {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("json") => DocType::Json,
        Some("html") | Some("htm") => DocType::Html,
        _ => DocType::Xml,
    }
}

fn display_name(path: &Path) -> String {
    path.display().to_string()
}

fn push_line(out: &mut String, label: Option<&str>, value: &str) {
    match label {
        Some(label) => {
            out.push_str(label);
            out.push_str(": ");
        }
        None => {}
    }
    out.push_str(value);
    out.push('\n');
}
