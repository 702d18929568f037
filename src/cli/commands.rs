use clap::{Parser, Subcommand};
use rusqlite::Connection;
use crate::catalogue::{field_catalogue, CatalogueRequest, Session};
use crate::cli::error::{user_error, validate_id, parse_value_assignment};
use crate::cli::output::{format_entry_detail, format_entry_table, format_form_summary, get_terminal_width};
use crate::config::Config;
use crate::db::DbConnection;
use crate::error::FilterError;
use crate::filter::{apply_view_filter, field_visibility, load_view_forms, normalize_str, AugmentContext, FieldOutput};
use crate::models::{Entry, Form, User, ViewerContext};
use crate::query::EntryQuery;
use crate::repo::{EntryRepo, FormRepo, SqliteDirectory, TermRepo, UserRepo, ViewRepo};
use anyhow::{Context, Result};

#[derive(Parser)]
#[command(name = "advfilter")]
#[command(about = "Advanced Filter - nested condition trees for form entry listings and field visibility")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Form management commands
    Form {
        #[command(subcommand)]
        subcommand: FormCommands,
    },
    /// User management commands
    User {
        #[command(subcommand)]
        subcommand: UserCommands,
    },
    /// Taxonomy term commands
    Term {
        #[command(subcommand)]
        subcommand: TermCommands,
    },
    /// Entry commands
    Entry {
        #[command(subcommand)]
        subcommand: EntryCommands,
    },
    /// View commands (filter configuration and filtered listings)
    View {
        #[command(subcommand)]
        subcommand: ViewCommands,
    },
}

#[derive(Subcommand)]
pub enum FormCommands {
    /// Import a form definition from a JSON file ({"id", "title", "fields": [...]})
    Import {
        /// Path to the JSON file
        file: String,
    },
    /// List imported forms
    List,
    /// Show a form and its fields
    Show {
        /// Form ID
        form_id: String,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// List the keys, operators and choices a filter can use for a form
    Fields {
        /// Form ID
        form_id: Option<String>,
        /// Login of the requesting user (must hold an admin capability)
        #[arg(long = "as", value_name = "LOGIN")]
        as_user: Option<String>,
        /// Request token; defaults to the session's own token
        #[arg(long)]
        token: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Add a user
    Add {
        /// Login name
        login: String,
        /// Role (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,
        /// Display name (defaults to the login)
        #[arg(long)]
        name: Option<String>,
        /// Email address
        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TermCommands {
    /// Add a taxonomy term
    Add {
        /// Term name
        name: String,
        /// Taxonomy
        #[arg(long, default_value = "category")]
        taxonomy: String,
    },
}

#[derive(Subcommand)]
pub enum EntryCommands {
    /// Add an entry to a form
    Add {
        /// Form ID
        form_id: String,
        /// Field values and meta as key=value (e.g., 3="Ana" 7=12 is_approved=1)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        values: Vec<String>,
        /// Login of the user who created the entry
        #[arg(long = "by", value_name = "LOGIN")]
        created_by: Option<String>,
        /// Creation date (UTC, "YYYY-MM-DD HH:MM:SS")
        #[arg(long = "date")]
        date_created: Option<String>,
        /// Entry status
        #[arg(long, default_value = "active")]
        status: String,
        /// Mark as starred
        #[arg(long)]
        starred: bool,
        /// Payment status
        #[arg(long)]
        payment_status: Option<String>,
        /// Payment date (UTC, "YYYY-MM-DD HH:MM:SS")
        #[arg(long)]
        payment_date: Option<String>,
        /// Submitter IP
        #[arg(long)]
        ip: Option<String>,
        /// Source URL
        #[arg(long)]
        source_url: Option<String>,
    },
    /// List the active entries of a form (unfiltered)
    List {
        /// Form ID
        form_id: String,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show an entry
    Show {
        /// Entry ID
        entry_id: String,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Check a field's conditional logic against an entry
    Visible {
        /// Entry ID
        entry_id: String,
        /// Field settings JSON, or @path to read them from a file
        #[arg(long)]
        config: String,
        /// Login of the viewing user (anonymous when omitted)
        #[arg(long = "as", value_name = "LOGIN")]
        as_user: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ViewCommands {
    /// Create a view over a form
    Create {
        /// Form ID
        form_id: String,
        /// View title
        title: String,
        /// Joined form ID (repeatable)
        #[arg(long = "join")]
        joined: Vec<String>,
    },
    /// Show or replace a view's stored filters
    Filters {
        /// View ID
        view_id: String,
        /// New filters JSON (flat or nested), or @path to read from a file
        #[arg(long)]
        set: Option<String>,
        /// Remove the stored filters
        #[arg(long, conflicts_with = "set")]
        clear: bool,
    },
    /// List the view's entries as a given viewer sees them
    Entries {
        /// View ID
        view_id: String,
        /// Login of the viewing user (anonymous when omitted)
        #[arg(long = "as", value_name = "LOGIN")]
        as_user: Option<String>,
        /// Maximum number of entries
        #[arg(long)]
        limit: Option<usize>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Print the SQL the view's filters compile to for a viewer
    Sql {
        /// View ID
        view_id: String,
        /// Login of the viewing user (anonymous when omitted)
        #[arg(long = "as", value_name = "LOGIN")]
        as_user: Option<String>,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    log::debug!("Using database {}", config.data_location.display());

    match cli.command {
        Commands::Form { subcommand } => handle_form(subcommand, &config),
        Commands::User { subcommand } => handle_user(subcommand, &config),
        Commands::Term { subcommand } => handle_term(subcommand, &config),
        Commands::Entry { subcommand } => handle_entry(subcommand, &config),
        Commands::View { subcommand } => handle_view(subcommand, &config),
    }
}

fn connect(config: &Config) -> Result<Connection> {
    DbConnection::connect(config).context("Failed to connect to database")
}

/// Read an inline argument, or a file when it starts with '@'
fn read_inline_or_file(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path)),
        None => Ok(arg.to_string()),
    }
}

/// Viewer for `--as LOGIN`; anonymous without it
fn resolve_viewer(conn: &Connection, login: Option<&str>) -> Result<ViewerContext> {
    let Some(login) = login else {
        return Ok(ViewerContext::anonymous());
    };
    match UserRepo::get_by_login(conn, login)? {
        Some(user) => Ok(user.viewer()),
        None => user_error(&format!("User '{}' not found", login)),
    }
}

fn require_form(conn: &Connection, id_str: &str) -> Result<Form> {
    let form_id = validate_id(id_str, "form").unwrap_or_else(|e| user_error(&e));
    match FormRepo::get_by_id(conn, form_id)? {
        Some(form) => Ok(form),
        None => user_error(&format!("Form {} not found", form_id)),
    }
}

/// Client-side failures become user errors; the rest propagate
fn report_filter_error(err: FilterError) -> anyhow::Error {
    if err.is_client_error() {
        user_error(&format!("{} (status {})", err, err.status_code()));
    }
    err.into()
}

fn handle_form(cmd: FormCommands, config: &Config) -> Result<()> {
    let conn = connect(config)?;

    match cmd {
        FormCommands::Import { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read form file: {}", file))?;
            let form: Form = match serde_json::from_str(&content) {
                Ok(form) => form,
                Err(e) => user_error(&format!("Invalid form definition in {}: {}", file, e)),
            };
            FormRepo::save(&conn, &form)?;
            println!("Imported form {} '{}' ({} fields)", form.id, form.title, form.fields.len());
            Ok(())
        }
        FormCommands::List => {
            let forms = FormRepo::list(&conn)?;
            if forms.is_empty() {
                println!("No forms found.");
                return Ok(());
            }
            println!("{:<6} {:<8} {}", "ID", "Fields", "Title");
            println!("{}", "-".repeat(40));
            for form in &forms {
                println!("{:<6} {:<8} {}", form.id, form.fields.len(), form.title);
            }
            Ok(())
        }
        FormCommands::Show { form_id, json } => {
            let form = require_form(&conn, &form_id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&form)?);
            } else {
                print!("{}", format_form_summary(&form));
            }
            Ok(())
        }
        FormCommands::Fields { form_id, as_user, token } => {
            let viewer = resolve_viewer(&conn, as_user.as_deref())?;
            let session = Session { token: uuid::Uuid::new_v4().simple().to_string(), viewer };
            let request = CatalogueRequest {
                form_id,
                token: Some(token.unwrap_or_else(|| session.token.clone())),
            };
            let catalogue = field_catalogue(&request, &session, &config.admin_capabilities, |id| {
                FormRepo::get_by_id(&conn, id)
            })
            .map_err(report_filter_error)?;
            println!("{}", serde_json::to_string_pretty(&catalogue)?);
            Ok(())
        }
    }
}

fn handle_user(cmd: UserCommands, config: &Config) -> Result<()> {
    let conn = connect(config)?;

    match cmd {
        UserCommands::Add { login, roles, name, email } => {
            if login.trim().is_empty() {
                user_error("Login cannot be empty");
            }
            if UserRepo::get_by_login(&conn, &login)?.is_some() {
                user_error(&format!("User '{}' already exists", login));
            }
            let mut user = User::new(&login, &roles);
            if let Some(name) = name {
                user.display_name = name;
            }
            user.email = email.unwrap_or_default();
            let user = UserRepo::create(&conn, &user)?;
            println!("Created user '{}' (id: {})", user.login, user.id.unwrap_or_default());
            Ok(())
        }
    }
}

fn handle_term(cmd: TermCommands, config: &Config) -> Result<()> {
    let conn = connect(config)?;

    match cmd {
        TermCommands::Add { name, taxonomy } => {
            let id = TermRepo::create(&conn, &name, &taxonomy)?;
            println!("Created term '{}' (id: {})", name, id);
            Ok(())
        }
    }
}

fn handle_entry(cmd: EntryCommands, config: &Config) -> Result<()> {
    let conn = connect(config)?;

    match cmd {
        EntryCommands::Add {
            form_id,
            values,
            created_by,
            date_created,
            status,
            starred,
            payment_status,
            payment_date,
            ip,
            source_url,
        } => {
            let form = require_form(&conn, &form_id)?;
            let mut entry = Entry::new(form.id);

            for assignment in &values {
                let (key, value) = parse_value_assignment(assignment).unwrap_or_else(|e| user_error(&e));
                entry.meta.insert(key, value);
            }
            if let Some(login) = created_by {
                entry.created_by = resolve_viewer(&conn, Some(&login))?.user_id;
            }
            if let Some(date) = date_created {
                if crate::utils::parse_stored_date(&date).is_none() {
                    user_error(&format!("Invalid date: '{}'", date));
                }
                entry.date_created = date.clone();
                entry.date_updated = date;
            }
            entry.status = status;
            entry.is_starred = starred;
            entry.payment_status = payment_status;
            entry.payment_date = payment_date;
            entry.ip = ip.unwrap_or_default();
            entry.source_url = source_url.unwrap_or_default();

            let entry = EntryRepo::create(&conn, &entry)?;
            println!("Created entry {} in form {}", entry.id.unwrap_or_default(), entry.form_id);
            Ok(())
        }
        EntryCommands::List { form_id, json } => {
            let form = require_form(&conn, &form_id)?;
            let entries = EntryRepo::list_for_form(&conn, form.id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No entries found.");
            } else {
                print!("{}", format_entry_table(&entries, &form, get_terminal_width()));
            }
            Ok(())
        }
        EntryCommands::Show { entry_id, json } => {
            let id = validate_id(&entry_id, "entry").unwrap_or_else(|e| user_error(&e));
            let Some(entry) = EntryRepo::get_by_id(&conn, id)? else {
                user_error(&format!("Entry {} not found", id));
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&entry)?);
            } else {
                let form = FormRepo::get_by_id(&conn, entry.form_id)?;
                let creator = match entry.created_by {
                    Some(id) => UserRepo::get_by_id(&conn, id)?.map(|u| u.login),
                    None => None,
                };
                print!("{}", format_entry_detail(&entry, form.as_ref(), creator.as_deref()));
            }
            Ok(())
        }
        EntryCommands::Visible { entry_id, config: field_config, as_user } => {
            let id = validate_id(&entry_id, "entry").unwrap_or_else(|e| user_error(&e));
            let Some(entry) = EntryRepo::get_by_id(&conn, id)? else {
                user_error(&format!("Entry {} not found", id));
            };
            let field_config = read_inline_or_file(&field_config)?;
            let viewer = resolve_viewer(&conn, as_user.as_deref())?;
            let forms = load_view_forms(&conn, entry.form_id, &[]).map_err(report_filter_error)?;
            let directory = SqliteDirectory::new(&conn);
            let ctx = AugmentContext {
                forms: &forms,
                viewer: &viewer,
                directory: &directory,
                admin_capabilities: &config.admin_capabilities,
                utc_offset: config.utc_offset,
                now: chrono::Utc::now(),
            };

            match field_visibility(&entry, &forms[0], &field_config, &ctx).map_err(report_filter_error)? {
                FieldOutput::Show => println!("shown"),
                FieldOutput::Fallback(text) => println!("hidden: {}", text),
            }
            Ok(())
        }
    }
}

fn handle_view(cmd: ViewCommands, config: &Config) -> Result<()> {
    let conn = connect(config)?;

    match cmd {
        ViewCommands::Create { form_id, title, joined } => {
            let form = require_form(&conn, &form_id)?;
            let mut joined_ids = Vec::new();
            for id_str in &joined {
                joined_ids.push(require_form(&conn, id_str)?.id);
            }
            let view = ViewRepo::create(&conn, form.id, &title, &joined_ids)?;
            println!("Created view {} '{}' over form {}", view.id, view.title, view.form_id);
            Ok(())
        }
        ViewCommands::Filters { view_id, set, clear } => {
            let id = validate_id(&view_id, "view").unwrap_or_else(|e| user_error(&e));
            let Some(view) = ViewRepo::get_by_id(&conn, id)? else {
                return Err(report_filter_error(FilterError::ViewNotFound(id)));
            };

            if clear {
                ViewRepo::set_filters(&conn, id, None)?;
                println!("Cleared filters of view {}", id);
                return Ok(());
            }
            if let Some(raw) = set {
                let raw = read_inline_or_file(&raw)?;
                let parsed: serde_json::Value = serde_json::from_str(&raw)
                    .map_err(|e| report_filter_error(FilterError::InvalidJson(e)))?;
                ViewRepo::set_filters(&conn, id, Some(&parsed.to_string()))?;
                println!("Saved filters of view {}", id);
                return Ok(());
            }

            let tree = normalize_str(view.filters.as_deref().unwrap_or_default());
            if tree.is_absent() {
                println!("No filters.");
            } else {
                println!("{}", serde_json::to_string_pretty(&tree.to_json())?);
            }
            Ok(())
        }
        ViewCommands::Entries { view_id, as_user, limit, json } => {
            let (view_form, query) = build_view_query(&conn, &view_id, as_user.as_deref(), config, limit)?;
            let entries = query.execute(&conn).context("Failed to list view entries")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No entries found.");
            } else {
                print!("{}", format_entry_table(&entries, &view_form, get_terminal_width()));
            }
            Ok(())
        }
        ViewCommands::Sql { view_id, as_user } => {
            let (_, query) = build_view_query(&conn, &view_id, as_user.as_deref(), config, None)?;
            let fragment = query.to_sql();
            println!("{}", fragment.sql);
            for (i, param) in fragment.params.iter().enumerate() {
                println!("  ?{} = {:?}", i + 1, param);
            }
            Ok(())
        }
    }
}

/// Entry query of a view with its filters applied for the viewer
fn build_view_query(
    conn: &Connection,
    view_id: &str,
    as_user: Option<&str>,
    config: &Config,
    limit: Option<usize>,
) -> Result<(Form, EntryQuery)> {
    let id = validate_id(view_id, "view").unwrap_or_else(|e| user_error(&e));
    let Some(view) = ViewRepo::get_by_id(conn, id)? else {
        return Err(report_filter_error(FilterError::ViewNotFound(id)));
    };
    let viewer = resolve_viewer(conn, as_user)?;
    let form = require_form(conn, &view.form_id.to_string())?;

    let mut query = EntryQuery::new(view.form_id);
    query.limit = limit;
    apply_view_filter(conn, &mut query, id, &viewer, config).map_err(report_filter_error)?;
    Ok((form, query))
}
