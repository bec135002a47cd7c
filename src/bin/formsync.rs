//! formsync CLI: manage forms held in a document store and a search index.
//!
//! Usage:
//!   formsync form <subcommand> [--config path]
//!   formsync collaborator toggle <form> <user>
//!   formsync response <subcommand>
//!   formsync user add <user>
//!   formsync reconcile
//!   formsync search <query>

use clap::{ArgAction, Parser, Subcommand};
use formsync::{
    Answer, FormId, FormSettings, FormsApi, FormsConfig, Membership, MutationError,
};
use std::path::PathBuf;
use tracing::{error, Level};

#[derive(Parser)]
#[command(
    name = "formsync",
    version,
    about = "Form records kept consistent across a document store and a search index"
)]
struct Cli {
    /// Path to a YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage forms
    Form {
        #[command(subcommand)]
        action: FormAction,
    },
    /// Manage collaborators
    Collaborator {
        #[command(subcommand)]
        action: CollaboratorAction,
    },
    /// Manage responses
    Response {
        #[command(subcommand)]
        action: ResponseAction,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Repair the search index from the document store
    Reconcile,
    /// Search forms by name or description
    Search {
        query: String,
    },
}

#[derive(Subcommand)]
enum FormAction {
    /// Create a form
    Create {
        #[arg(long)]
        author: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        color: String,
        /// URL to send respondents to after submitting
        #[arg(long)]
        redirect: Option<String>,
    },
    /// Show a form
    Show { id: String },
    /// List all forms
    List,
    /// Change a form's settings; omitted fields keep their value
    Settings {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        color: Option<String>,
        /// Pass an empty string to clear
        #[arg(long)]
        redirect: Option<String>,
    },
    /// Delete a form; requires its exact name
    Delete {
        id: String,
        #[arg(long)]
        confirm: String,
    },
}

#[derive(Subcommand)]
enum CollaboratorAction {
    /// Add the user if absent, remove it if present
    Toggle { id: String, user: String },
}

#[derive(Subcommand)]
enum ResponseAction {
    /// Record a response; answers are given as LABEL=TEXT
    Add {
        id: String,
        #[arg(long = "answer", required = true)]
        answers: Vec<String>,
    },
    /// Delete a response by id
    Delete { id: String, response: String },
    /// List responses, newest first
    List { id: String },
}

#[derive(Subcommand)]
enum UserAction {
    /// Register a user
    Add { user: String },
}

fn init_logging(config: &FormsConfig, verbose: u8) {
    let level = match verbose {
        0 => config.log_level.parse().unwrap_or(Level::INFO),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

/// Print a mutation failure and return the exit code
fn report(e: &MutationError) -> i32 {
    if e.is_fault() {
        error!(error = %e, "mutation failed");
    }
    eprintln!("Error: {}", e.user_message());
    1
}

fn parse_answer(raw: &str) -> Option<Answer> {
    let (label, text) = raw.split_once('=')?;
    Some(Answer::new(label.trim(), text.trim()))
}

fn print_form(form: &formsync::FormRecord) {
    println!("id:          {}", form.id);
    println!("name:        {}", form.settings.name);
    println!("description: {}", form.settings.description);
    println!("color:       {}", form.settings.color);
    println!(
        "redirect:    {}",
        form.settings.redirect_on_completion.as_deref().unwrap_or("-")
    );
    println!("author:      {}", form.id_author.as_deref().unwrap_or("-"));
    println!("team:        {}", form.collaborators.join(", "));
    println!("responses:   {}", form.responses.len());
}

async fn cmd_form_create(api: &FormsApi, author: &str, settings: FormSettings) -> i32 {
    match api.create_form(author, settings).await {
        Ok(form) => {
            println!("Created form '{}' ({})", form.name(), form.id);
            0
        }
        Err(e) => report(&e),
    }
}

async fn cmd_form_show(api: &FormsApi, id: &FormId) -> i32 {
    match api.get_form(id).await {
        Ok(form) => {
            print_form(&form);
            0
        }
        Err(e) => report(&e),
    }
}

async fn cmd_form_list(api: &FormsApi) -> i32 {
    let forms = match api.list_forms().await {
        Ok(forms) => forms,
        Err(e) => return report(&e),
    };
    if forms.is_empty() {
        println!("No forms defined.");
        return 0;
    }
    println!("{:<36}  {:<24}  {:>9}", "ID", "NAME", "RESPONSES");
    println!("{}", "-".repeat(73));
    for form in forms {
        println!("{:<36}  {:<24}  {:>9}", form.id, form.name(), form.responses.len());
    }
    0
}

async fn cmd_form_settings(
    api: &FormsApi,
    id: &FormId,
    name: Option<String>,
    description: Option<String>,
    color: Option<String>,
    redirect: Option<String>,
) -> i32 {
    let current = match api.get_form(id).await {
        Ok(form) => form.settings,
        Err(e) => return report(&e),
    };
    let proposed = FormSettings {
        name: name.unwrap_or(current.name),
        description: description.unwrap_or(current.description),
        color: color.unwrap_or(current.color),
        redirect_on_completion: redirect.or(current.redirect_on_completion),
    };
    match api.submit_settings(id, proposed).await {
        Ok(form) => {
            println!("Updated settings of '{}'", form.name());
            0
        }
        Err(e) => report(&e),
    }
}

async fn cmd_form_delete(api: &FormsApi, id: &FormId, confirm: &str) -> i32 {
    match api.delete_form(id, confirm).await {
        Ok(nav) => {
            println!("Deleted form {} (back to {})", id, nav.path());
            0
        }
        Err(e) => report(&e),
    }
}

async fn cmd_collaborator_toggle(api: &FormsApi, id: &FormId, user: &str) -> i32 {
    match api.toggle_collaborator(id, user).await {
        Ok((_, Membership::Added)) => {
            println!("Added '{}' to {}", user, id);
            0
        }
        Ok((_, Membership::Removed)) => {
            println!("Removed '{}' from {}", user, id);
            0
        }
        Err(e) => report(&e),
    }
}

async fn cmd_response_add(api: &FormsApi, id: &FormId, raw: &[String]) -> i32 {
    let mut answers = Vec::with_capacity(raw.len());
    for entry in raw {
        match parse_answer(entry) {
            Some(answer) => answers.push(answer),
            None => {
                eprintln!("Error: answer '{}' is not LABEL=TEXT", entry);
                return 1;
            }
        }
    }
    match api.record_response(id, answers).await {
        Ok(response) => {
            println!("Recorded response {}", response.id_response);
            0
        }
        Err(e) => report(&e),
    }
}

async fn cmd_response_delete(api: &FormsApi, id: &FormId, response: &str) -> i32 {
    match api.delete_response(id, response).await {
        Ok(_) => {
            println!("Deleted response {}", response);
            0
        }
        Err(e) => report(&e),
    }
}

async fn cmd_response_list(api: &FormsApi, id: &FormId) -> i32 {
    let form = match api.get_form(id).await {
        Ok(form) => form,
        Err(e) => return report(&e),
    };
    if form.responses.is_empty() {
        println!("No responses.");
        return 0;
    }
    for response in form.responses_newest_first() {
        println!("{}  {}", response.id_response, response.created_at.to_rfc3339());
        for answer in &response.responses {
            println!("    {}: {}", answer.label, answer.text);
        }
    }
    0
}

async fn cmd_user_add(api: &FormsApi, user: &str) -> i32 {
    match api.add_user(user).await {
        Ok(()) => {
            println!("Registered user '{}'", user);
            0
        }
        Err(e) => report(&e),
    }
}

async fn cmd_reconcile(api: &FormsApi) -> i32 {
    match api.reconcile().await {
        Ok(report) => {
            println!(
                "checked {}, in sync {}, repaired {}, restored {}, orphans removed {}, skipped {}",
                report.checked,
                report.in_sync,
                report.repaired,
                report.restored,
                report.orphans_removed,
                report.skipped
            );
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn cmd_search(api: &FormsApi, query: &str) -> i32 {
    match api.search(query).await {
        Ok(hits) if hits.is_empty() => {
            println!("No matches.");
            0
        }
        Ok(hits) => {
            for hit in hits {
                println!("{}  {}", hit.object_id, hit.name);
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn run(api: FormsApi, command: Commands) -> i32 {
    match command {
        Commands::Form { action } => match action {
            FormAction::Create {
                author,
                name,
                description,
                color,
                redirect,
            } => {
                let mut settings = FormSettings::new(name, description, color);
                settings.redirect_on_completion = redirect;
                cmd_form_create(&api, &author, settings).await
            }
            FormAction::Show { id } => cmd_form_show(&api, &FormId::from(id)).await,
            FormAction::List => cmd_form_list(&api).await,
            FormAction::Settings {
                id,
                name,
                description,
                color,
                redirect,
            } => cmd_form_settings(&api, &FormId::from(id), name, description, color, redirect).await,
            FormAction::Delete { id, confirm } => cmd_form_delete(&api, &FormId::from(id), &confirm).await,
        },
        Commands::Collaborator { action } => match action {
            CollaboratorAction::Toggle { id, user } => {
                cmd_collaborator_toggle(&api, &FormId::from(id), &user).await
            }
        },
        Commands::Response { action } => match action {
            ResponseAction::Add { id, answers } => cmd_response_add(&api, &FormId::from(id), &answers).await,
            ResponseAction::Delete { id, response } => {
                cmd_response_delete(&api, &FormId::from(id), &response).await
            }
            ResponseAction::List { id } => cmd_response_list(&api, &FormId::from(id)).await,
        },
        Commands::User { action } => match action {
            UserAction::Add { user } => cmd_user_add(&api, &user).await,
        },
        Commands::Reconcile => cmd_reconcile(&api).await,
        Commands::Search { query } => cmd_search(&api, &query).await,
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match FormsConfig::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    init_logging(&config, cli.verbose);

    let api = match FormsApi::open(&config) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("Error: Failed to open stores: {}", e);
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };
    let code = runtime.block_on(run(api, cli.command));
    std::process::exit(code);
}
