use anyhow::{anyhow, bail, Context, Result};
use clap::{Arg, ArgMatches, Command};
use rpassword::prompt_password;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use axiom_core::auth::{validate_password, DeletionAuthority};
use axiom_core::content::NoteSummary;
use axiom_core::store::{load_store, save_store};
use axiom_core::utils::io::prompt_with_confirmation;
use axiom_core::utils::{format_duration, format_timestamp, initialize_logging};
use axiom_core::{Platform, PlatformConfig, RecordId, CONFIG_FILE, CONFIG_FILE_ENV};

fn user_arg() -> Arg {
    Arg::new("user")
        .long("user")
        .short('u')
        .help("Username or email to act as")
        .required(true)
}

fn password_arg() -> Arg {
    Arg::new("password")
        .long("password")
        .help("Password (prompted for when omitted)")
}

/// Leaf command run on behalf of a logged-in user
fn acting(command: Command) -> Command {
    command.arg(user_arg()).arg(password_arg())
}

fn id_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).help(help).required(true)
}

fn cli() -> Command {
    Command::new("axiom")
        .about("Accounts, courses and study content for the Axiom learning platform")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .help("Path to the JSON configuration file"),
        )
        .subcommand(
            Command::new("init-config").about("Write the effective configuration to the config file"),
        )
        .subcommand(
            Command::new("register")
                .about("Create a new account")
                .arg(id_arg("username", "Unique username"))
                .arg(id_arg("email", "Email address"))
                .arg(id_arg("first_name", "First name"))
                .arg(id_arg("last_name", "Last name"))
                .arg(password_arg()),
        )
        .subcommand(
            Command::new("verify")
                .about("Verify an email address")
                .arg(id_arg("token", "Verification token")),
        )
        .subcommand(
            Command::new("login")
                .about("Check credentials and show the account")
                .arg(id_arg("identifier", "Username or email"))
                .arg(password_arg()),
        )
        .subcommand(
            Command::new("change-password")
                .about("Change the password of an account")
                .arg(id_arg("identifier", "Username or email")),
        )
        .subcommand(
            Command::new("forgot-password")
                .about("Request a password reset token")
                .arg(id_arg("email", "Email address of the account")),
        )
        .subcommand(
            Command::new("reset-password")
                .about("Set a new password with a reset token")
                .arg(id_arg("token", "Reset token")),
        )
        .subcommand(
            Command::new("deactivate")
                .about("Deactivate your account")
                .arg(id_arg("identifier", "Username or email"))
                .arg(password_arg()),
        )
        .subcommand(
            Command::new("delete-account")
                .about("Permanently delete your account and everything it owns")
                .arg(id_arg("identifier", "Username or email"))
                .arg(password_arg()),
        )
        .subcommand(
            Command::new("profile")
                .about("Show profile, preferences and study statistics")
                .arg(user_arg())
                .arg(password_arg()),
        )
        .subcommand(
            Command::new("bootstrap-admin")
                .about("Create or promote an administrator")
                .arg(id_arg("username", "Admin username"))
                .arg(id_arg("email", "Admin email address"))
                .arg(id_arg("first_name", "First name"))
                .arg(id_arg("last_name", "Last name"))
                .arg(password_arg()),
        )
        .subcommand(
            Command::new("admin")
                .about("Administrative account operations")
                .subcommand_required(true)
                .subcommand(acting(Command::new("list").about("List all accounts")))
                .subcommand(acting(
                    Command::new("promote")
                        .about("Grant admin rights")
                        .arg(id_arg("target", "Username or email of the account")),
                ))
                .subcommand(acting(
                    Command::new("unlock")
                        .about("Clear failed login attempts")
                        .arg(id_arg("target", "Username or email of the account")),
                ))
                .subcommand(acting(
                    Command::new("reactivate")
                        .about("Reactivate a deactivated account")
                        .arg(id_arg("target", "Username or email of the account")),
                ))
                .subcommand(acting(
                    Command::new("delete")
                        .about("Delete an account and everything it owns")
                        .arg(id_arg("target", "Username or email of the account")),
                )),
        )
        .subcommand(
            Command::new("course")
                .about("Manage your courses")
                .subcommand_required(true)
                .subcommand(acting(
                    Command::new("create")
                        .about("Create a course")
                        .arg(id_arg("title", "Course title"))
                        .arg(
                            Arg::new("description")
                                .long("description")
                                .default_value("")
                                .help("Course description"),
                        ),
                ))
                .subcommand(acting(Command::new("list").about("List your courses")))
                .subcommand(acting(
                    Command::new("delete")
                        .about("Delete a course with its modules and content")
                        .arg(id_arg("course_id", "Course id")),
                )),
        )
        .subcommand(
            Command::new("module")
                .about("Manage the modules of a course")
                .subcommand_required(true)
                .subcommand(acting(
                    Command::new("create")
                        .about("Add a module to a course")
                        .arg(id_arg("course_id", "Course id"))
                        .arg(id_arg("title", "Module title"))
                        .arg(
                            Arg::new("description")
                                .long("description")
                                .default_value("")
                                .help("Module description"),
                        ),
                ))
                .subcommand(acting(
                    Command::new("list")
                        .about("List the modules of a course")
                        .arg(id_arg("course_id", "Course id")),
                ))
                .subcommand(acting(
                    Command::new("delete")
                        .about("Delete a module with its content")
                        .arg(id_arg("module_id", "Module id")),
                )),
        )
        .subcommand(
            Command::new("note")
                .about("Manage your study notes")
                .subcommand_required(true)
                .subcommand(acting(
                    Command::new("add")
                        .about("Save a note from a text file")
                        .arg(id_arg("title", "Note title"))
                        .arg(id_arg("topic", "Note topic"))
                        .arg(id_arg("file", "Path to the note text")),
                ))
                .subcommand(acting(Command::new("list").about("List your notes"))),
        )
        .subcommand(
            Command::new("generate")
                .about("Generate study material from a note")
                .subcommand_required(true)
                .subcommand(acting(
                    Command::new("flashcards")
                        .about("Create a flashcard deck in a module")
                        .arg(id_arg("module_id", "Target module id"))
                        .arg(id_arg("note_id", "Source note id")),
                ))
                .subcommand(acting(
                    Command::new("quiz")
                        .about("Create a quiz in a module")
                        .arg(id_arg("module_id", "Target module id"))
                        .arg(id_arg("note_id", "Source note id")),
                ))
                .subcommand(acting(
                    Command::new("chapters")
                        .about("Suggest video chapters for a note")
                        .arg(id_arg("note_id", "Source note id")),
                )),
        )
}

fn arg<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing argument '{}'", name))
}

fn id(matches: &ArgMatches, name: &str) -> Result<RecordId> {
    arg(matches, name).map(RecordId::from)
}

/// Password from `--password`, or prompted for without echo
fn password(matches: &ArgMatches, prompt: &str) -> Result<String> {
    match matches.get_one::<String>("password") {
        Some(password) => Ok(password.clone()),
        None => prompt_password(prompt).context("failed to read password"),
    }
}

/// Prompt twice for a new password and check it against the policy
fn new_password() -> Result<String> {
    loop {
        let first = prompt_password("New password: ").context("failed to read password")?;
        if let Err(e) = validate_password(&first) {
            println!("{}", e);
            continue;
        }
        let confirm = prompt_password("Confirm password: ").context("failed to read password")?;
        if first != confirm {
            println!("Passwords don't match. Please try again.");
            continue;
        }
        return Ok(first);
    }
}

/// Log in as `--user` and return the account id
fn acting_user(platform: &Platform, matches: &ArgMatches) -> Result<RecordId> {
    let identifier = arg(matches, "user")?;
    let password = password(matches, &format!("Password for {}: ", identifier))?;
    Ok(platform.accounts.login(identifier, &password)?.id)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn dispatch(platform: &Platform, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("register", sub)) => {
            let password = match sub.get_one::<String>("password") {
                Some(password) => password.clone(),
                None => new_password()?,
            };
            let registration = platform.accounts.register(
                arg(sub, "username")?,
                arg(sub, "email")?,
                &password,
                arg(sub, "first_name")?,
                arg(sub, "last_name")?,
            )?;
            println!("Account created with id {}", registration.user_id);
            println!("Verification token: {}", registration.verification_token);
            println!(
                "The token is valid for {}",
                format_duration(platform.accounts.policy().token_ttl_secs)
            );
        }
        Some(("verify", sub)) => {
            platform.accounts.verify_email(arg(sub, "token")?)?;
            println!("Email verified successfully");
        }
        Some(("login", sub)) => {
            let identifier = arg(sub, "identifier")?;
            let password = password(sub, "Password: ")?;
            let summary = platform.accounts.login(identifier, &password)?;
            println!("Welcome back, {}!", summary.first_name);
            print_json(&summary)?;
        }
        Some(("change-password", sub)) => {
            let identifier = arg(sub, "identifier")?;
            let user_id = platform.accounts.find_by_identifier(identifier)?.id;
            let current = prompt_password("Current password: ").context("failed to read password")?;
            platform
                .accounts
                .change_password(&user_id, &current, &new_password()?)?;
            println!("Password changed successfully");
        }
        Some(("forgot-password", sub)) => {
            let info = platform.accounts.request_password_reset(arg(sub, "email")?)?;
            println!("{}", info.message);
            // The terminal stands in for the email channel
            if let Some(token) = info.token {
                println!("Reset token: {}", token);
            }
        }
        Some(("reset-password", sub)) => {
            platform
                .accounts
                .reset_password(arg(sub, "token")?, &new_password()?)?;
            println!("Password has been reset, you can now log in");
        }
        Some(("deactivate", sub)) => {
            let identifier = arg(sub, "identifier")?;
            let user_id = platform.accounts.find_by_identifier(identifier)?.id;
            let password = password(sub, "Password: ")?;
            platform.accounts.deactivate(&user_id, &password)?;
            println!("Account deactivated");
        }
        Some(("delete-account", sub)) => {
            let identifier = arg(sub, "identifier")?;
            let user_id = platform.accounts.find_by_identifier(identifier)?.id;
            let password = password(sub, "Password: ")?;
            if !prompt_with_confirmation(
                "This removes your account with all courses and notes.",
                "Are you sure?",
            )? {
                println!("Nothing deleted");
                return Ok(());
            }
            let report = platform
                .accounts
                .delete_account(&user_id, DeletionAuthority::SelfService { password })?;
            println!("Account deleted ({})", report);
        }
        Some(("profile", sub)) => {
            let user_id = acting_user(platform, sub)?;
            let profile = platform.profiles.get_profile(&user_id)?;
            println!("Member since {}", format_timestamp(profile.created_at));
            print_json(&profile)?;
        }
        Some(("bootstrap-admin", sub)) => {
            let password = match sub.get_one::<String>("password") {
                Some(password) => password.clone(),
                None => new_password()?,
            };
            let outcome = platform.admin.bootstrap_admin(
                arg(sub, "username")?,
                arg(sub, "email")?,
                &password,
                arg(sub, "first_name")?,
                arg(sub, "last_name")?,
            )?;
            println!("{:?}", outcome);
        }
        Some(("admin", sub)) => admin_command(platform, sub)?,
        Some(("course", sub)) => course_command(platform, sub)?,
        Some(("module", sub)) => module_command(platform, sub)?,
        Some(("note", sub)) => note_command(platform, sub)?,
        Some(("generate", sub)) => generate_command(platform, sub)?,
        _ => bail!("unknown command"),
    }
    Ok(())
}

fn admin_command(platform: &Platform, matches: &ArgMatches) -> Result<()> {
    let (command, sub) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("missing command"))?;
    let admin_id = acting_user(platform, sub)?;
    let admin = &platform.admin;
    match command {
        "list" => {
            for user in admin.list_users(&admin_id)? {
                println!(
                    "{} {:<20} {:<30} admin={} active={} verified={}",
                    user.id, user.username, user.email, user.is_admin, user.is_active, user.is_verified
                );
            }
        }
        "promote" => {
            let target = platform.accounts.find_by_identifier(arg(sub, "target")?)?.id;
            admin.promote_to_admin(&admin_id, &target)?;
            println!("Account promoted to admin");
        }
        "unlock" => {
            let target = platform.accounts.find_by_identifier(arg(sub, "target")?)?.id;
            admin.unlock_account(&admin_id, &target)?;
            println!("Account unlocked");
        }
        "reactivate" => {
            let target = platform.accounts.find_by_identifier(arg(sub, "target")?)?.id;
            admin.reactivate_user(&admin_id, &target)?;
            println!("Account reactivated");
        }
        "delete" => {
            let target = platform.accounts.find_by_identifier(arg(sub, "target")?)?.id;
            let report = admin.admin_delete_user(&admin_id, &target)?;
            println!("Account deleted ({})", report);
        }
        _ => bail!("unknown admin command"),
    }
    Ok(())
}

fn course_command(platform: &Platform, matches: &ArgMatches) -> Result<()> {
    let (command, sub) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("missing command"))?;
    let user_id = acting_user(platform, sub)?;
    let courses = &platform.courses;
    match command {
        "create" => {
            let course =
                courses.create_course(&user_id, arg(sub, "title")?, arg(sub, "description")?)?;
            println!("Course created with id {}", course.id);
        }
        "list" => {
            for course in courses.list_user_courses(&user_id)? {
                println!(
                    "{}  {}  (updated {})",
                    course.id,
                    course.title,
                    format_timestamp(course.last_updated)
                );
            }
        }
        "delete" => {
            let report = courses.delete_course(&id(sub, "course_id")?, &user_id)?;
            println!("Course deleted ({})", report);
        }
        _ => bail!("unknown course command"),
    }
    Ok(())
}

fn module_command(platform: &Platform, matches: &ArgMatches) -> Result<()> {
    let (command, sub) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("missing command"))?;
    let user_id = acting_user(platform, sub)?;
    let courses = &platform.courses;
    match command {
        "create" => {
            let module = courses.create_module(
                &id(sub, "course_id")?,
                &user_id,
                arg(sub, "title")?,
                arg(sub, "description")?,
            )?;
            println!("Module created with id {}", module.id);
        }
        "list" => {
            let course_id = id(sub, "course_id")?;
            // Listing goes through the owner check like every other course access
            platform.resolver.authorize_course(&course_id, &user_id)?;
            for module in courses.list_course_modules(&course_id)? {
                println!("{}  {}", module.id, module.title);
            }
        }
        "delete" => {
            let report = courses.delete_module(&id(sub, "module_id")?, &user_id)?;
            println!("Module deleted ({})", report);
        }
        _ => bail!("unknown module command"),
    }
    Ok(())
}

fn note_command(platform: &Platform, matches: &ArgMatches) -> Result<()> {
    let (command, sub) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("missing command"))?;
    let user_id = acting_user(platform, sub)?;
    match command {
        "add" => {
            let path = PathBuf::from(arg(sub, "file")?);
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let note = platform.content.save_note(
                &user_id,
                arg(sub, "title")?,
                arg(sub, "topic")?,
                &content,
            )?;
            println!("Note saved with id {}", note.id);
        }
        "list" => {
            let notes: Vec<NoteSummary> = platform.content.list_notes(&user_id)?;
            for note in notes {
                println!("{}  {} [{}]", note.id, note.title, note.topic);
                println!("    {}", note.content_preview);
            }
        }
        _ => bail!("unknown note command"),
    }
    Ok(())
}

fn generate_command(platform: &Platform, matches: &ArgMatches) -> Result<()> {
    let (command, sub) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("missing command"))?;
    let user_id = acting_user(platform, sub)?;
    let content = &platform.content;
    match command {
        "flashcards" => {
            let deck = content.generate_flashcards_from_note(
                &id(sub, "module_id")?,
                &id(sub, "note_id")?,
                &user_id,
            )?;
            println!("Created '{}' with {} cards", deck.title, deck.cards.len());
        }
        "quiz" => {
            let quiz = content.generate_quiz_from_note(
                &id(sub, "module_id")?,
                &id(sub, "note_id")?,
                &user_id,
            )?;
            println!("Created '{}' with {} questions", quiz.title, quiz.questions.len());
        }
        "chapters" => {
            let suggestions = content.suggest_video_chapters_from_note(&id(sub, "note_id")?, &user_id)?;
            for (index, chapter) in suggestions.iter().enumerate() {
                println!("{}. {}", index + 1, chapter.title);
                println!("   {}", chapter.description);
            }
        }
        _ => bail!("unknown generate command"),
    }
    Ok(())
}

fn run() -> Result<()> {
    let matches = cli().get_matches();

    let config_path = matches
        .get_one::<String>("config")
        .cloned()
        .or_else(|| std::env::var(CONFIG_FILE_ENV).ok())
        .unwrap_or_else(|| CONFIG_FILE.to_string());
    let config = PlatformConfig::load(&PathBuf::from(&config_path))?;
    initialize_logging(&config.log).context("failed to initialize logging")?;

    if matches.subcommand_name() == Some("init-config") {
        config.save(&PathBuf::from(&config_path))?;
        println!("Configuration written to {}", config_path);
        return Ok(());
    }

    let store = Arc::new(
        load_store(&config.data_file)
            .with_context(|| format!("failed to load {}", config.data_file.display()))?,
    );
    let platform = Platform::new(store.clone(), &config)?;

    // Persist even when the command failed half way, e.g. an interrupted cascade
    let outcome = dispatch(&platform, &matches);
    save_store(&store, &config.data_file)
        .with_context(|| format!("failed to save {}", config.data_file.display()))?;
    outcome
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
