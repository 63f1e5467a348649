use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use insight::config::{ClientConfig, CredentialBackend, APP_NAME, VERSION};
use insight::gateway::types::{FileUpload, NewTextDocument, NewUser, UserUpdate};
use insight::gateway::{Backend, ErrorKind, GatewayError};
use insight::models::{ContentType, Message, Role, User};
use insight::services::credentials::{CredentialStore, KeyringCredentials, MemoryCredentials};
use insight::services::export::export_to_markdown;
use insight::services::{
    AppSettings, ChatState, ConversationStore, Database, SessionStore, SettingsService,
};

const HELP: &str = "\
Type a question to ask Insight. Commands:
  /new [title]                  start a new conversation
  /list                         list recent conversations
  /open <id>                    open a conversation
  /delete <id>                  delete a conversation
  /sources                      sources behind the latest answer
  /export [path]                current conversation as Markdown
  /search <query>               semantic search over the library
  /documents [page]             browse documents
  /areas                        practice areas
  /news                         latest IBM news
  /stats                        library statistics (admin)
  /users                        list users (admin)
  /login <email> <password>     sign in
  /register <email> <password> [company]
  /logout                       sign out
  /whoami                       current profile
  /password <current> <new>     change your password
  /admin <command>              user and library management (admin):
      create-user <email> <password> [company]
      grant <user-id> | revoke <user-id>
      enable <user-id> | disable <user-id>
      user-areas <user-id> <area-id>...
      delete-user <user-id>
      areas
      documents [page]
      add-text <area-id> <file> <title>
      upload <area-id> <content-type> <file> [title]
      delete-document <document-id>
  /help                         this text
  /quit                         exit";

#[derive(Debug, PartialEq, Eq)]
enum AdminCommand {
    CreateUser {
        email: String,
        password: String,
        company: Option<String>,
    },
    SetAdmin { user_id: String, admin: bool },
    SetActive { user_id: String, active: bool },
    UserAreas { user_id: String, area_ids: Vec<i64> },
    DeleteUser(String),
    Areas,
    Documents(u32),
    AddText {
        area_id: i64,
        path: String,
        title: String,
    },
    Upload {
        area_id: i64,
        content_type: ContentType,
        path: String,
        title: Option<String>,
    },
    DeleteDocument(String),
}

impl AdminCommand {
    fn parse(words: &[&str]) -> Command {
        let Some((name, args)) = words.split_first() else {
            return Command::Usage("/admin <command>, see /help");
        };
        let command = match (*name, args) {
            ("create-user", [email, password, company @ ..]) => AdminCommand::CreateUser {
                email: email.to_string(),
                password: password.to_string(),
                company: (!company.is_empty()).then(|| company.join(" ")),
            },
            ("create-user", _) => {
                return Command::Usage("/admin create-user <email> <password> [company]")
            }
            ("grant" | "revoke", [user_id]) => AdminCommand::SetAdmin {
                user_id: user_id.to_string(),
                admin: *name == "grant",
            },
            ("grant" | "revoke", _) => return Command::Usage("/admin grant|revoke <user-id>"),
            ("enable" | "disable", [user_id]) => AdminCommand::SetActive {
                user_id: user_id.to_string(),
                active: *name == "enable",
            },
            ("enable" | "disable", _) => {
                return Command::Usage("/admin enable|disable <user-id>")
            }
            ("user-areas", [user_id, ids @ ..]) => {
                match ids.iter().map(|id| id.parse::<i64>()).collect::<Result<Vec<_>, _>>() {
                    Ok(area_ids) => AdminCommand::UserAreas {
                        user_id: user_id.to_string(),
                        area_ids,
                    },
                    Err(_) => return Command::Usage("/admin user-areas <user-id> <area-id>..."),
                }
            }
            ("user-areas", _) => return Command::Usage("/admin user-areas <user-id> <area-id>..."),
            ("delete-user", [user_id]) => AdminCommand::DeleteUser(user_id.to_string()),
            ("delete-user", _) => return Command::Usage("/admin delete-user <user-id>"),
            ("areas", []) => AdminCommand::Areas,
            ("areas", _) => return Command::Usage("/admin areas"),
            ("documents", []) => AdminCommand::Documents(1),
            ("documents", [page]) => match page.parse::<u32>() {
                Ok(page) if page > 0 => AdminCommand::Documents(page),
                _ => return Command::Usage("/admin documents [page]"),
            },
            ("documents", _) => return Command::Usage("/admin documents [page]"),
            ("add-text", [area, path, title @ ..]) if !title.is_empty() => {
                match area.parse::<i64>() {
                    Ok(area_id) => AdminCommand::AddText {
                        area_id,
                        path: path.to_string(),
                        title: title.join(" "),
                    },
                    Err(_) => return Command::Usage("/admin add-text <area-id> <file> <title>"),
                }
            }
            ("add-text", _) => return Command::Usage("/admin add-text <area-id> <file> <title>"),
            ("upload", [area, content_type, path, title @ ..]) => {
                match (area.parse::<i64>(), ContentType::from_str(content_type)) {
                    (Ok(area_id), Some(content_type)) => AdminCommand::Upload {
                        area_id,
                        content_type,
                        path: path.to_string(),
                        title: (!title.is_empty()).then(|| title.join(" ")),
                    },
                    _ => {
                        return Command::Usage(
                            "/admin upload <area-id> <content-type> <file> [title]",
                        )
                    }
                }
            }
            ("upload", _) => {
                return Command::Usage("/admin upload <area-id> <content-type> <file> [title]")
            }
            ("delete-document", [id]) => AdminCommand::DeleteDocument(id.to_string()),
            ("delete-document", _) => {
                return Command::Usage("/admin delete-document <document-id>")
            }
            (other, _) => return Command::Unknown(format!("admin {}", other)),
        };
        Command::Admin(command)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Send(String),
    New(Option<String>),
    List,
    Open(String),
    Delete(String),
    Sources,
    Export(Option<String>),
    Search(String),
    Documents(u32),
    Areas,
    News,
    Stats,
    Users,
    Login { email: String, password: String },
    Register {
        email: String,
        password: String,
        company: Option<String>,
    },
    Logout,
    WhoAmI,
    Password { current: String, new: String },
    Admin(AdminCommand),
    Help,
    Quit,
    Usage(&'static str),
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Some(Command::Send(line.to_string()));
        };

        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };
        let words: Vec<&str> = args.split_whitespace().collect();

        let command = match name {
            "new" => Command::New((!args.is_empty()).then(|| args.to_string())),
            "list" => Command::List,
            "open" => match words.as_slice() {
                [id] => Command::Open(id.to_string()),
                _ => Command::Usage("/open <id>"),
            },
            "delete" => match words.as_slice() {
                [id] => Command::Delete(id.to_string()),
                _ => Command::Usage("/delete <id>"),
            },
            "sources" => Command::Sources,
            "export" => Command::Export((!args.is_empty()).then(|| args.to_string())),
            "search" if !args.is_empty() => Command::Search(args.to_string()),
            "search" => Command::Usage("/search <query>"),
            "documents" => match words.as_slice() {
                [] => Command::Documents(1),
                [page] => match page.parse::<u32>() {
                    Ok(page) if page > 0 => Command::Documents(page),
                    _ => Command::Usage("/documents [page]"),
                },
                _ => Command::Usage("/documents [page]"),
            },
            "areas" => Command::Areas,
            "news" => Command::News,
            "stats" => Command::Stats,
            "users" => Command::Users,
            "login" => match words.as_slice() {
                [email, password] => Command::Login {
                    email: email.to_string(),
                    password: password.to_string(),
                },
                _ => Command::Usage("/login <email> <password>"),
            },
            "register" => match words.as_slice() {
                [email, password, company @ ..] => Command::Register {
                    email: email.to_string(),
                    password: password.to_string(),
                    company: (!company.is_empty()).then(|| company.join(" ")),
                },
                _ => Command::Usage("/register <email> <password> [company]"),
            },
            "logout" => Command::Logout,
            "whoami" => Command::WhoAmI,
            "password" => match words.as_slice() {
                [current, new] => Command::Password {
                    current: current.to_string(),
                    new: new.to_string(),
                },
                _ => Command::Usage("/password <current> <new>"),
            },
            "admin" => AdminCommand::parse(&words),
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        };
        Some(command)
    }
}

pub struct App {
    backend: Backend,
    settings: AppSettings,
    session: SessionStore,
    chat: Arc<ConversationStore>,
}

impl App {
    pub async fn init(config: ClientConfig) -> Result<Self> {
        let credentials = Self::credentials(&config).await;
        let db = Database::new(&config.database_path())
            .await
            .context("Failed to open local database")?;
        let settings = SettingsService::load(&db).await;

        let backend = Backend::connect(&config, credentials.clone());
        let session = SessionStore::new(backend.auth.clone(), credentials, db);
        match session.restore().await {
            Ok(true) => {}
            Ok(false) => tracing::debug!("No saved session"),
            Err(e) => tracing::warn!("Failed to restore session: {}", e),
        }

        let chat = Arc::new(
            ConversationStore::new(backend.chat.clone())
                .with_page_size(settings.conversation_page_size),
        );

        Ok(Self {
            backend,
            settings,
            session,
            chat,
        })
    }

    async fn credentials(config: &ClientConfig) -> Arc<dyn CredentialStore> {
        match config.credentials {
            CredentialBackend::Memory => Arc::new(MemoryCredentials::new()),
            CredentialBackend::Keyring => match KeyringCredentials::new().await {
                Ok(keyring) => Arc::new(keyring),
                Err(e) => {
                    tracing::warn!("Keyring unavailable, keeping tokens in memory: {:#}", e);
                    Arc::new(MemoryCredentials::new())
                }
            },
        }
    }

    pub async fn run(self) -> Result<()> {
        println!("{} {}{}", APP_NAME, VERSION, if self.backend.is_demo() { " (demo)" } else { "" });
        match self.session.user() {
            Some(user) => println!("Signed in as {}", user.email),
            None if self.backend.is_demo() => {}
            None => println!("Not signed in. Use /login <email> <password>."),
        }
        println!("Type /help for commands.\n");

        self.chat.load_conversations().await;
        self.report_chat_error().await;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.context("Failed to read input")? {
            let Some(command) = Command::parse(&line) else {
                continue;
            };
            if command == Command::Quit {
                break;
            }
            self.handle(command).await;
        }
        Ok(())
    }

    async fn handle(&self, command: Command) {
        match command {
            Command::Send(text) => {
                println!("Thinking...");
                self.chat.send_message(&text).await;
                let state = self.chat.state();
                if state.error.is_none() {
                    if let Some(reply) = state.messages.last().filter(|m| m.role == Role::Assistant) {
                        print_message(reply);
                        if !state.sources.is_empty() {
                            println!("({} sources, /sources to list)\n", state.sources.len());
                        }
                    }
                }
            }
            Command::New(None) => {
                self.chat.create_new_conversation();
                println!("Started a new conversation.");
            }
            Command::New(Some(title)) => {
                match self.backend.chat.create_conversation(Some(&title)).await {
                    Ok(conversation) => {
                        self.chat.load_conversations().await;
                        self.chat.load_conversation(&conversation.id).await;
                        println!(
                            "Started \"{}\" ({}).",
                            conversation.display_title(),
                            conversation.id
                        );
                    }
                    Err(e) => self.report(e).await,
                }
            }
            Command::List => {
                self.chat.load_conversations().await;
                print_conversations(&self.chat.state());
            }
            Command::Open(id) => {
                self.chat.load_conversation(&id).await;
                let state = self.chat.state();
                if state.error.is_none() {
                    if let Some(current) = &state.current {
                        println!("== {} ==\n", current.display_title());
                    }
                    for message in &state.messages {
                        print_message(message);
                    }
                }
            }
            Command::Delete(id) => {
                self.chat.delete_conversation(&id).await;
                if self.chat.state().error.is_none() {
                    println!("Deleted {}.", id);
                }
            }
            Command::Sources => {
                let state = self.chat.state();
                if state.sources.is_empty() {
                    println!("No sources for the latest answer.");
                }
                for (i, source) in state.sources.iter().enumerate() {
                    println!(
                        "{}. {} [{} / {}] {:.0}%\n   {}",
                        i + 1,
                        source.title,
                        source.practice_area,
                        source.content_type,
                        source.similarity * 100.0,
                        source.content_preview
                    );
                }
            }
            Command::Export(path) => {
                let state = self.chat.state();
                let markdown =
                    export_to_markdown(state.current.as_ref(), &state.messages, &state.sources);
                match path {
                    Some(path) => match tokio::fs::write(&path, markdown).await {
                        Ok(()) => println!("Exported to {}.", path),
                        Err(e) => eprintln!("Export failed: {}", e),
                    },
                    None => println!("{}", markdown),
                }
            }
            Command::Search(query) => {
                let result = self
                    .backend
                    .research
                    .search(&query, None, self.settings.search_limit)
                    .await;
                match result {
                    Ok(response) => {
                        println!("{} results for {:?}", response.total_results, response.query);
                        for hit in response.results {
                            println!(
                                "- {} [{}] {:.0}%\n  {}",
                                hit.title,
                                hit.practice_area,
                                hit.similarity * 100.0,
                                hit.content_preview
                            );
                        }
                    }
                    Err(e) => self.report(e).await,
                }
            }
            Command::Documents(page) => {
                let result = self
                    .backend
                    .research
                    .list_documents(page, self.settings.document_page_size, None)
                    .await;
                match result {
                    Ok(listing) => {
                        println!(
                            "Page {} ({} documents total)",
                            listing.page, listing.total
                        );
                        for doc in listing.documents {
                            println!("- {} ({}) {}", doc.title, doc.content_type.as_str(), doc.id);
                        }
                    }
                    Err(e) => self.report(e).await,
                }
            }
            Command::Areas => match self.backend.research.practice_areas().await {
                Ok(areas) => {
                    for area in areas {
                        println!("{:>3}  {}", area.id, area.name);
                    }
                }
                Err(e) => self.report(e).await,
            },
            Command::News => match self.backend.research.news(self.settings.news_limit).await {
                Ok(items) => {
                    for item in items {
                        println!(
                            "- {} ({}, {})\n  {}",
                            item.title,
                            item.source,
                            item.date.format("%Y-%m-%d"),
                            item.summary
                        );
                    }
                }
                Err(e) => self.report(e).await,
            },
            Command::Stats => match self.backend.admin.stats().await {
                Ok(stats) => println!(
                    "Users: {}  Documents: {}  Vectors: {}",
                    stats.users, stats.documents, stats.vectors
                ),
                Err(e) => self.report(e).await,
            },
            Command::Users => {
                let result = self
                    .backend
                    .admin
                    .list_users(0, self.settings.document_page_size)
                    .await;
                match result {
                    Ok(users) => {
                        for user in users {
                            println!(
                                "- {}{} ({})",
                                user.email,
                                if user.is_admin { " [admin]" } else { "" },
                                user.company_name.as_deref().unwrap_or("-")
                            );
                        }
                    }
                    Err(e) => self.report(e).await,
                }
            }
            Command::Login { email, password } => {
                if let Ok(user) = self.session.login(&email, &password).await {
                    println!("Signed in as {}.", user.email);
                }
                self.report_session_error();
            }
            Command::Register {
                email,
                password,
                company,
            } => {
                let result = self
                    .session
                    .register(&email, &password, company.as_deref())
                    .await;
                if let Ok(user) = result {
                    println!("Registered and signed in as {}.", user.email);
                }
                self.report_session_error();
            }
            Command::Logout => {
                self.session.logout().await;
                self.chat.create_new_conversation();
                println!("Signed out.");
            }
            Command::WhoAmI => {
                if !self.backend.is_demo() || self.session.is_authenticated() {
                    self.session.refresh_user().await;
                }
                match self.session.user() {
                    Some(user) => {
                        println!(
                            "{} ({}){}",
                            user.email,
                            user.company_name.as_deref().unwrap_or("no company"),
                            if user.is_admin { " [admin]" } else { "" }
                        );
                        let areas: Vec<&str> =
                            user.practice_areas.iter().map(|a| a.name.as_str()).collect();
                        if !areas.is_empty() {
                            println!("Practice areas: {}", areas.join(", "));
                        }
                    }
                    None => println!("Not signed in."),
                }
                self.report_session_error();
            }
            Command::Password { current, new } => {
                if self.session.change_password(&current, &new).await.is_ok() {
                    println!("Password changed.");
                }
                self.report_session_error();
            }
            Command::Admin(command) => self.handle_admin(command).await,
            Command::Help => println!("{}", HELP),
            Command::Usage(usage) => println!("Usage: {}", usage),
            Command::Unknown(name) => println!("Unknown command /{}. Try /help.", name),
            Command::Quit => {}
        }
        self.report_chat_error().await;
    }

    async fn handle_admin(&self, command: AdminCommand) {
        let admin = &self.backend.admin;
        match command {
            AdminCommand::CreateUser {
                email,
                password,
                company,
            } => {
                let new_user = NewUser {
                    email,
                    password,
                    company_name: company,
                    ..NewUser::default()
                };
                match admin.create_user(new_user).await {
                    Ok(user) => {
                        print!("Created ");
                        print_user(&user);
                    }
                    Err(e) => self.report(e).await,
                }
            }
            AdminCommand::SetAdmin { user_id, admin: is_admin } => {
                let update = UserUpdate {
                    is_admin: Some(is_admin),
                    ..UserUpdate::default()
                };
                match admin.update_user(&user_id, update).await {
                    Ok(user) => print_user(&user),
                    Err(e) => self.report(e).await,
                }
            }
            AdminCommand::SetActive { user_id, active } => {
                let update = UserUpdate {
                    is_active: Some(active),
                    ..UserUpdate::default()
                };
                match admin.update_user(&user_id, update).await {
                    Ok(user) => print_user(&user),
                    Err(e) => self.report(e).await,
                }
            }
            AdminCommand::UserAreas { user_id, area_ids } => {
                match admin.update_user_practice_areas(&user_id, &area_ids).await {
                    Ok(user) => print_user(&user),
                    Err(e) => self.report(e).await,
                }
            }
            AdminCommand::DeleteUser(user_id) => match admin.delete_user(&user_id).await {
                Ok(()) => println!("Deleted user {}.", user_id),
                Err(e) => self.report(e).await,
            },
            AdminCommand::Areas => match admin.list_practice_areas().await {
                Ok(areas) => {
                    for area in areas {
                        println!("{:>3}  {} ({})", area.id, area.name, area.slug);
                    }
                }
                Err(e) => self.report(e).await,
            },
            AdminCommand::Documents(page) => {
                let limit = self.settings.document_page_size;
                let skip = (page - 1).saturating_mul(limit);
                match admin.list_all_documents(skip, limit, None).await {
                    Ok(documents) => {
                        if documents.is_empty() {
                            println!("No documents on page {}.", page);
                        }
                        for doc in documents {
                            println!(
                                "- {} ({}, area {}, {} chunks) {}",
                                doc.title,
                                doc.content_type.as_str(),
                                doc.practice_area_id,
                                doc.chunk_count,
                                doc.id
                            );
                        }
                    }
                    Err(e) => self.report(e).await,
                }
            }
            AdminCommand::AddText {
                area_id,
                path,
                title,
            } => {
                let content = match tokio::fs::read_to_string(&path).await {
                    Ok(content) => content,
                    Err(e) => {
                        eprintln!("Error: cannot read {}: {}", path, e);
                        return;
                    }
                };
                let doc = NewTextDocument {
                    title,
                    content,
                    practice_area_id: area_id,
                    content_type: None,
                    description: None,
                    author: None,
                    source_url: None,
                };
                match admin.upload_text_document(doc).await {
                    Ok(doc) => println!("Added {} ({}).", doc.title, doc.id),
                    Err(e) => self.report(e).await,
                }
            }
            AdminCommand::Upload {
                area_id,
                content_type,
                path,
                title,
            } => {
                let data = match tokio::fs::read(&path).await {
                    Ok(data) => data,
                    Err(e) => {
                        eprintln!("Error: cannot read {}: {}", path, e);
                        return;
                    }
                };
                let path = Path::new(&path);
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "upload".to_string());
                let title = title.unwrap_or_else(|| {
                    path.file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| file_name.clone())
                });
                let upload = FileUpload {
                    file_name,
                    data,
                    title,
                    practice_area_id: area_id,
                    content_type,
                    description: None,
                    author: None,
                };
                match admin.upload_file_document(upload).await {
                    Ok(doc) => println!(
                        "Uploaded {} ({}, {} chunks).",
                        doc.title, doc.id, doc.chunk_count
                    ),
                    Err(e) => self.report(e).await,
                }
            }
            AdminCommand::DeleteDocument(id) => match admin.delete_document(&id).await {
                Ok(()) => println!("Deleted document {}.", id),
                Err(e) => self.report(e).await,
            },
        }
    }

    async fn report(&self, err: GatewayError) {
        eprintln!("Error: {}", err);
        if matches!(err, GatewayError::SessionExpired) {
            self.session.expire().await;
        }
    }

    async fn report_chat_error(&self) {
        let Some(error) = self.chat.state().error else {
            return;
        };
        eprintln!("Error: {}", error);
        self.chat.clear_error();
        if error.kind == ErrorKind::SessionExpired {
            self.session.expire().await;
        }
    }

    fn report_session_error(&self) {
        if let Some(error) = self.session.state().error {
            eprintln!("Error: {}", error);
            self.session.clear_error();
        }
    }
}

fn print_conversations(state: &ChatState) {
    if state.conversations.is_empty() {
        println!("No conversations yet.");
    }
    for conversation in &state.conversations {
        let marker = if state.current_id() == Some(conversation.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {}  {}  ({})",
            marker,
            conversation.id,
            conversation.display_title(),
            conversation.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
}

fn print_user(user: &User) {
    let areas: Vec<&str> = user.practice_areas.iter().map(|a| a.name.as_str()).collect();
    println!(
        "{} {}{}{} areas: {}",
        user.id,
        user.email,
        if user.is_admin { " [admin]" } else { "" },
        if user.is_active { "" } else { " [disabled]" },
        if areas.is_empty() { "-".to_string() } else { areas.join(", ") }
    );
}

fn print_message(message: &Message) {
    let label = match message.role {
        Role::User => "You",
        Role::Assistant => "Insight",
        Role::System => "System",
    };
    println!("[{}]\n{}\n", label, message.content);
}
