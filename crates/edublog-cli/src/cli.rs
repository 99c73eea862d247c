//! CLI (Command Line Interface) mode
//!
//! Interactive REPL over the session manager and the route gate. Every
//! screen-backed command navigates first, so the gate decides whether the
//! request is sent at all.

use std::sync::Arc;

use edublog_api::{ApiError, BlogClient, Post};
use edublog_core::{
    Decision, Navigator, RedirectReason, Route, RouteKind, RouteTable, Session, SessionManager,
    SessionStatus, route::evaluate,
};
use nu_ansi_term::{Color, Style};
use reedline::{
    ColumnarMenu, Completer, DefaultHinter, Emacs, KeyCode, KeyModifiers, Keybindings,
    MenuBuilder, Prompt, Reedline, ReedlineEvent, ReedlineMenu, Signal, Suggestion,
};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Available commands for autocomplete display
const COMMANDS: &[(&str, &str)] = &[
    ("/login", "ログイン: /login <email> <password>"),
    ("/logout", "ログアウト"),
    ("/whoami", "現在のセッションを表示"),
    ("/go", "画面を移動: /go <path>"),
    ("/where", "現在の画面を表示"),
    ("/routes", "現在のナビゲーショングラフの画面一覧"),
    ("/posts", "投稿一覧: /posts [search]"),
    ("/post", "投稿とコメントを表示: /post <id>"),
    ("/like", "投稿にいいね: /like <id>"),
    ("/comment", "コメントを投稿: /comment <post id> <text>"),
    ("/users", "ユーザー一覧 (管理者のみ)"),
    ("/help", "ヘルプを表示"),
    ("/exit", "プログラムを終了"),
    ("/quit", "プログラムを終了"),
];

/// Page size used by list commands
const PAGE_SIZE: u32 = 20;

/// Command completer for reedline
#[derive(Clone)]
pub struct CommandCompleter {
    commands: Vec<(&'static str, &'static str)>,
}

impl CommandCompleter {
    pub fn new() -> Self {
        Self {
            commands: COMMANDS.to_vec(),
        }
    }
}

impl Default for CommandCompleter {
    fn default() -> Self {
        Self::new()
    }
}

impl Completer for CommandCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        if !line.starts_with('/') {
            return Vec::new();
        }

        self.commands
            .iter()
            .filter(|(cmd, _)| cmd.starts_with(line))
            .map(|(cmd, desc)| Suggestion {
                value: cmd.to_string(),
                description: Some(desc.to_string()),
                extra: None,
                span: reedline::Span::new(0, pos),
                append_whitespace: true,
                style: None,
            })
            .collect()
    }
}

/// Prompt showing who is signed in
struct ColoredPrompt {
    label: String,
    style: Style,
}

impl ColoredPrompt {
    fn for_session(session: &Session) -> Self {
        let (label, style) = match (session.status, session.authenticated_user()) {
            (_, Some(user)) => (format!("{} · {}", user.name, user.role()), Color::Green.bold()),
            (SessionStatus::Initializing, _) => ("起動中".to_string(), Color::Yellow.bold()),
            (SessionStatus::Authenticating, _) => ("ログイン中".to_string(), Color::Yellow.bold()),
            _ => ("guest".to_string(), Color::Cyan.bold()),
        };
        Self { label, style }
    }
}

impl Prompt for ColoredPrompt {
    fn render_prompt_left(&self) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Owned(self.style.paint(format!("[{}] > ", self.label)).to_string())
    }

    fn render_prompt_right(&self) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _prompt_mode: reedline::PromptEditMode) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }

    fn render_prompt_history_search_indicator(
        &self,
        _history_search: reedline::PromptHistorySearch,
    ) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }
}

/// Parsed REPL command
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Login { email: String, password: String },
    Logout,
    WhoAmI,
    Go(String),
    Where,
    Routes,
    Posts { search: Option<String> },
    Post(String),
    Like(String),
    Comment { post_id: String, text: String },
    Users,
    Help,
    Exit,
}

/// Parse one input line; `Err` carries the message to print
fn parse_command(input: &str) -> Result<Command, String> {
    let input = input.trim();
    let (head, rest) = match input.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (input, ""),
    };
    let arg = |usage: &str| {
        if rest.is_empty() {
            Err(format!("使い方: {}", usage))
        } else {
            Ok(rest.to_string())
        }
    };

    match head.to_lowercase().as_str() {
        "/login" => {
            let mut parts = rest.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(email), Some(password)) => Ok(Command::Login {
                    email: email.to_string(),
                    password: password.to_string(),
                }),
                _ => Err("使い方: /login <email> <password>".to_string()),
            }
        }
        "/logout" => Ok(Command::Logout),
        "/whoami" => Ok(Command::WhoAmI),
        "/go" => arg("/go <path>").map(Command::Go),
        "/where" => Ok(Command::Where),
        "/routes" => Ok(Command::Routes),
        "/posts" => Ok(Command::Posts {
            search: (!rest.is_empty()).then(|| rest.to_string()),
        }),
        "/post" => arg("/post <id>").map(Command::Post),
        "/like" => arg("/like <id>").map(Command::Like),
        "/comment" => match rest.split_once(char::is_whitespace) {
            Some((post_id, text)) if !text.trim().is_empty() => Ok(Command::Comment {
                post_id: post_id.to_string(),
                text: text.trim().to_string(),
            }),
            _ => Err("使い方: /comment <post id> <text>".to_string()),
        },
        "/users" => Ok(Command::Users),
        "/help" | "/?" => Ok(Command::Help),
        "/exit" | "/quit" | "/q" => Ok(Command::Exit),
        _ => Err(format!(
            "不明なコマンド: {}。/help でコマンド一覧を確認してください。",
            input
        )),
    }
}

/// Whether a login may be submitted now.
///
/// The login screen must be reachable and no exchange may be in flight.
fn login_gate(session: &Session, pending: bool) -> Result<(), &'static str> {
    if pending || session.status == SessionStatus::Authenticating {
        return Err("ログイン処理中です。完了までお待ちください。");
    }
    match evaluate(session, &Route::Login) {
        Decision::Allow => Ok(()),
        Decision::Defer => Err("起動処理中です。少し待ってから再試行してください。"),
        Decision::Redirect { .. } => Err("すでにログインしています。/logout してから再試行してください。"),
    }
}

fn reason_text(reason: RedirectReason) -> &'static str {
    match reason {
        RedirectReason::Unauthenticated => "ログインが必要です",
        RedirectReason::AlreadyAuthenticated => "すでにログインしています",
        RedirectReason::InsufficientRole => "この画面を開く権限がありません",
    }
}

fn screen_label(route: &Route) -> String {
    let title = route.kind().map_or("Not Found", RouteKind::title);
    format!("{} ({})", title, route)
}

/// Route with a placeholder parameter, for listing the graph
fn template_route(kind: RouteKind) -> Route {
    let id = ":id".to_string();
    match kind {
        RouteKind::Login => Route::Login,
        RouteKind::Home => Route::Home,
        RouteKind::ManageUsers => Route::ManageUsers,
        RouteKind::MyProfile => Route::MyProfile,
        RouteKind::PostDetail => Route::PostDetail(id),
        RouteKind::UserProfile => Route::UserProfile(id),
        RouteKind::CreatePost => Route::CreatePost,
        RouteKind::EditPost => Route::EditPost(id),
        RouteKind::AddUser => Route::AddUser,
        RouteKind::EditUser => Route::EditUser(id),
        RouteKind::UserDetails => Route::UserDetails(id),
        RouteKind::Modal => Route::Modal,
    }
}

enum Flow {
    Continue,
    Exit,
}

/// REPL state
struct Repl {
    session: Arc<SessionManager>,
    client: BlogClient,
    navigator: Navigator,
    pending_login: Option<JoinHandle<edublog_core::Result<()>>>,
}

impl Repl {
    fn new(session: Arc<SessionManager>, client: BlogClient) -> Self {
        let navigator = Navigator::new(session.subscribe());
        Self {
            session,
            client,
            navigator,
            pending_login: None,
        }
    }

    /// Report a finished background login and follow session changes
    async fn poll_background(&mut self) {
        if self.pending_login.as_ref().is_some_and(JoinHandle::is_finished) {
            if let Some(handle) = self.pending_login.take() {
                match handle.await {
                    Ok(Ok(())) => println!("\n✅ ログインしました。\n"),
                    Ok(Err(edublog_core::Error::Superseded)) => {
                        println!("\nℹ️  ログインは取り消されました。\n")
                    }
                    Ok(Err(e)) => eprintln!("\n❌ {}\n", e.user_message()),
                    Err(e) => eprintln!("\n❌ ログイン処理が異常終了しました: {}\n", e),
                }
            }
        }

        if let Some(decision) = self.navigator.sync() {
            debug!("Session changed: {:?}", decision);
            self.print_position();
        }
    }

    fn print_position(&self) {
        match self.navigator.current() {
            Some(route) => println!("📍 {}", screen_label(route)),
            None => println!("⏳ 起動中..."),
        }
    }

    /// Navigate and print the outcome; true when the screen was opened
    fn open(&mut self, path: &str) -> bool {
        let requested = Route::parse(path);
        match self.navigator.navigate(path) {
            Decision::Allow => {
                println!("📍 {}", screen_label(&requested));
                true
            }
            Decision::Defer => {
                println!("⏳ 起動中です。セッションの確認が終わると {} に移動します。", requested);
                false
            }
            Decision::Redirect { to, reason } => {
                println!("↪  {} → {} ({})", requested, to, reason_text(reason));
                false
            }
        }
    }

    async fn dispatch(&mut self, command: Command) -> Flow {
        match command {
            Command::Login { email, password } => {
                match login_gate(&self.session.session(), self.pending_login.is_some()) {
                    Ok(()) => {
                        let session = Arc::clone(&self.session);
                        self.pending_login = Some(tokio::spawn(async move {
                            session.login(&email, &password).await
                        }));
                        println!("🔐 ログイン中... (Enter で結果を確認)");
                    }
                    Err(message) => println!("⚠️  {}", message),
                }
            }
            Command::Logout => {
                self.session.logout().await;
                println!("👋 ログアウトしました。");
            }
            Command::WhoAmI => self.print_session(),
            Command::Go(path) => {
                self.open(&path);
            }
            Command::Where => self.print_position(),
            Command::Routes => self.print_routes(),
            Command::Posts { search } => {
                if self.open("/") {
                    let result = self.client.list_posts(1, PAGE_SIZE, search.as_deref()).await;
                    self.report(result.map(|page| print_posts(&page.items)));
                }
            }
            Command::Post(id) => {
                if self.open(&format!("/posts/{}", id)) {
                    let result = self.show_post(&id).await;
                    self.report(result);
                }
            }
            Command::Like(id) => {
                let result = self.client.like_post(&id).await;
                self.report(result.map(|status| match (status.liked, status.likes) {
                    (Some(false), _) => println!("🤍 いいねを取り消しました。"),
                    (_, Some(likes)) => println!("❤️  いいね! (合計 {})", likes),
                    _ => println!("❤️  いいね!"),
                }));
            }
            Command::Comment { post_id, text } => {
                let result = self.client.create_comment(&post_id, &text).await;
                self.report(result.map(|_| println!("💬 コメントを投稿しました。")));
            }
            Command::Users => {
                if self.open("/two") {
                    let result = self.client.list_users(1, PAGE_SIZE).await;
                    self.report(result.map(|page| {
                        println!();
                        for user in &page.items {
                            let status = if user.is_active { "" } else { " (inactive)" };
                            println!("  • [{}] {} <{}> {}{}", user.id, user.name, user.email, user.role(), status);
                        }
                        println!();
                    }));
                }
            }
            Command::Help => print_help(),
            Command::Exit => {
                println!("\n👋 さようなら！\n");
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    async fn show_post(&self, id: &str) -> edublog_api::Result<()> {
        let post = self.client.get_post(id).await?;
        let comments = self.client.list_comments(id).await?;

        println!();
        println!("📝 {}", Style::new().bold().paint(&post.title));
        if let Some(author) = &post.author {
            println!("   {} ({})", author.name, author.role);
        }
        println!("{}", "─".repeat(50));
        println!("{}", post.content);
        println!("{}", "─".repeat(50));
        println!("❤️  {}  💬 {}", post.likes, comments.len());
        for comment in &comments.items {
            let author = comment.author.as_ref().map_or("?", |a| a.name.as_str());
            println!("  • {}: {}", author, comment.content);
        }
        println!();
        Ok(())
    }

    fn report(&self, result: edublog_api::Result<()>) {
        if let Err(e) = result {
            print_api_error(&e);
        }
    }

    fn print_session(&self) {
        let session = self.session.session();
        println!();
        println!("🔎 状態: {:?}", session.status);
        match session.authenticated_user() {
            Some(user) => {
                println!("   ユーザー: {} <{}>", user.name, user.email);
                println!("   ロール: {}", user.role());
                println!(
                    "   投稿作成: {} / ユーザー管理: {}",
                    yes_no(user.can_author_posts()),
                    yes_no(user.can_manage_users())
                );
            }
            None => println!("   未ログイン"),
        }
        println!();
    }

    fn print_routes(&self) {
        let session = self.session.session();
        let table = RouteTable::for_session(&session);
        println!();
        println!("🧭 ナビゲーショングラフ: {}", table.name());
        for kind in table.kinds() {
            let route = template_route(*kind);
            let mark = match evaluate(&session, &route) {
                Decision::Allow => "✅",
                Decision::Defer => "⏳",
                Decision::Redirect { .. } => "🚫",
            };
            println!("  {} {:<22} {}", mark, route.to_string(), kind.title());
        }
        println!();
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "可" } else { "不可" }
}

fn print_posts(posts: &[Post]) {
    println!();
    if posts.is_empty() {
        println!("  (投稿はありません)");
    }
    for post in posts {
        let author = post.author.as_ref().map_or("?", |a| a.name.as_str());
        println!(
            "  • [{}] {} - {} (❤️ {} 💬 {})",
            post.id, post.title, author, post.likes, post.comments
        );
    }
    println!();
}

fn print_api_error(error: &ApiError) {
    debug!("Command failed: {}", error);
    eprintln!("\n❌ エラー: {}\n", error.user_message());
}

/// Run CLI interactive mode
pub async fn run_cli(session: Arc<SessionManager>, client: BlogClient) -> anyhow::Result<()> {
    info!("Starting CLI mode");

    print_welcome();

    let mut keybindings = default_keybindings();

    // Trigger completion on '/' key
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Char('/'),
        ReedlineEvent::Edit(vec![reedline::EditCommand::Complete]),
    );

    let menu = Box::new(
        ColumnarMenu::default()
            .with_name("command_menu")
            .with_columns(1)
            .with_column_width(Some(50))
            .with_only_buffer_difference(false),
    );

    let hinter = DefaultHinter::default().with_style(Style::new().dimmed());

    let mut line_editor = Reedline::create()
        .with_completer(Box::new(CommandCompleter::new()))
        .with_menu(ReedlineMenu::EngineCompleter(menu))
        .with_hinter(Box::new(hinter))
        .with_edit_mode(Box::new(Emacs::new(keybindings)));

    let mut repl = Repl::new(session, client);
    repl.print_position();

    loop {
        repl.poll_background().await;
        let prompt = ColoredPrompt::for_session(&repl.session.session());

        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }

                let command = match parse_command(input) {
                    Ok(command) => command,
                    Err(message) => {
                        eprintln!("\n❓ {}\n", message);
                        continue;
                    }
                };

                if let Flow::Exit = repl.dispatch(command).await {
                    break;
                }
            }
            Ok(Signal::CtrlC) => {
                println!("^C");
                continue;
            }
            Ok(Signal::CtrlD) => {
                println!("\n👋 さようなら！\n");
                break;
            }
            Err(err) => {
                eprintln!("\n❌ エラー: {}\n", err);
                break;
            }
        }
    }

    Ok(())
}

/// Default keybindings for reedline
fn default_keybindings() -> Keybindings {
    let mut keybindings = Keybindings::new();
    // Tab key triggers completion
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::Edit(vec![reedline::EditCommand::Complete]),
    );
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Enter, ReedlineEvent::Submit);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Esc, ReedlineEvent::Esc);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('c'), ReedlineEvent::CtrlC);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('d'), ReedlineEvent::CtrlD);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Up, ReedlineEvent::Up);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Down, ReedlineEvent::Down);
    keybindings
}

/// Print welcome message
fn print_welcome() {
    println!();
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║          📚 edublog CLI - 対話モード                       ║");
    println!("╠════════════════════════════════════════════════════════════╣");
    println!("║  /login <email> <password> でログイン                      ║");
    println!("║  コマンド: /help, /posts, /go, /whoami, /exit              ║");
    println!("║  / を入力するとコマンド候補が表示されます                   ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();
}

/// Print help message
fn print_help() {
    println!();
    println!("📖 利用可能なコマンド:");
    for (cmd, desc) in COMMANDS {
        println!("  {} - {}", cmd, desc);
    }
    println!();
    println!("💡 ヒント: / から入力するとコマンド候補が表示されます");
    println!("💡 矢印キー(↑/↓)で候補を選択、Enterで確定できます");
    println!();
}
