//! Line-oriented front end.
//!
//! Each input line is split shell-style and parsed with clap, then turned
//! into an `App` call. Results are printed to stdout; diagnostics go through
//! tracing.

use clap::{Parser, Subcommand};

use crate::app::{ActionOutcome, App};
use crate::error::ClientError;
use crate::remote::{FavoriteStore, SiteApi};
use crate::sync::SyncOutcome;
use crate::ui::Page;
use crate::ui::card::CardAction;

#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_help_flag = true)]
pub struct Line {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ShellCommand {
    /// Log in with a username and password
    Login { username: String, password: String },
    /// Create an account, then log in
    Register { username: String, password: String },
    /// End the session
    Logout,
    /// Go to a page path such as /favorites or /places/CA
    Go { path: String },
    /// List the states offered by the service
    States,
    /// Search places in a state
    Search {
        state: String,
        #[arg(default_value = "all")]
        category: String,
    },
    /// Favorite a place
    Fav { name: String, state: String, category: String },
    /// Favorite the n-th search result
    Pick { index: usize },
    /// Show details of the n-th search result
    Details { index: usize },
    /// Delete a favorite by id
    Rm { id: String },
    /// Show the favorites page
    Favorites,
    /// Print the current page
    Show,
    /// Toggle dark mode
    Dark,
    /// Leave the shell
    Quit,
}

pub enum Flow {
    Continue,
    Exit,
}

/// Splits a line on whitespace, honouring single and double quotes.
pub fn split_line(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_word = false;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}

pub fn parse_line(line: &str) -> Result<Option<ShellCommand>, clap::Error> {
    let words = split_line(line);
    if words.is_empty() {
        return Ok(None);
    }
    Line::try_parse_from(words).map(|line| Some(line.command))
}

pub async fn execute<B: FavoriteStore + SiteApi>(app: &App<B>, command: ShellCommand) -> Flow {
    let result = match command {
        ShellCommand::Quit => return Flow::Exit,
        ShellCommand::Login { username, password } => app.login(&username, &password).await.map(|_| {
            println!("logged in as {}", username);
        }),
        ShellCommand::Register { username, password } => {
            app.register(&username, &password).await.map(|_| {
                println!("registered and logged in as {}", username);
            })
        }
        ShellCommand::Logout => {
            app.logout();
            println!("logged out");
            Ok(())
        }
        ShellCommand::Go { path } => match Page::from_path(&path) {
            Some(page) => app.navigate(page).await.map(|_| print_page(app)),
            None => {
                println!("unknown page: {}", path);
                Ok(())
            }
        },
        ShellCommand::States => app.load_states().await.map(|_| {
            for state in app.states() {
                println!("{}", state);
            }
        }),
        ShellCommand::Search { state, category } => {
            app.document().navigate(Page::Places { state: state.clone() });
            app.search(&state, &category).await.map(|_| print_page(app))
        }
        ShellCommand::Fav { name, state, category } => app
            .toggle_favorite(&name, &state, &category)
            .await
            .map(print_outcome),
        ShellCommand::Pick { index } => match place_action(app, index, true) {
            Some(action) => app.handle(action).await.map(print_outcome),
            None => {
                println!("no search result #{}", index);
                Ok(())
            }
        },
        ShellCommand::Details { index } => match place_action(app, index, false) {
            Some(action) => app.handle(action).await.map(print_outcome),
            None => {
                println!("no search result #{}", index);
                Ok(())
            }
        },
        ShellCommand::Rm { id } => app.delete_favorite(&id).await.map(print_outcome),
        ShellCommand::Favorites => app.navigate(Page::Favorites).await.map(|_| print_page(app)),
        ShellCommand::Show => {
            print_page(app);
            Ok(())
        }
        ShellCommand::Dark => app.toggle_dark_mode().map(|enabled| {
            println!("{} mode", if enabled { "dark" } else { "light" });
        }),
    };

    if let Err(e) = result {
        report(&e);
    }
    Flow::Continue
}

fn place_action<B: FavoriteStore + SiteApi>(app: &App<B>, index: usize, favorite: bool) -> Option<CardAction> {
    let doc = app.document();
    let card = doc.place_cards().get(index.checked_sub(1)?)?;
    card.actions()
        .into_iter()
        .find(|action| matches!(action, CardAction::Favorite(_)) == favorite)
}

fn print_page<B: FavoriteStore + SiteApi>(app: &App<B>) {
    let doc = app.document();
    match doc.page() {
        Page::Favorites => println!("{}", doc.render_favorites_html()),
        Page::Places { .. } | Page::Categories => {
            for (i, card) in doc.place_cards().iter().enumerate() {
                let control = doc.buttons().get(card.control);
                let marker = match control {
                    Some(c) if c.favorited => "*",
                    Some(c) if c.pending => "~",
                    _ => " ",
                };
                println!("{:>3} {} {} ({})", i + 1, marker, card.place.name, card.place.category);
            }
            if doc.place_cards().is_empty() {
                println!("{}", doc.render_places_html());
            }
        }
        page => println!("on {}", page),
    }
}

fn print_outcome(outcome: ActionOutcome) {
    match outcome {
        ActionOutcome::Synced(SyncOutcome::Added { key, id: Some(id) }) => {
            println!("favorited {} (id {})", key, id)
        }
        ActionOutcome::Synced(SyncOutcome::Added { key, id: None }) => {
            println!("{} was already a favorite", key)
        }
        ActionOutcome::Synced(SyncOutcome::Removed { id, .. }) => println!("removed favorite {}", id),
        ActionOutcome::Local { key, favorited } => {
            println!("{} {} locally", if favorited { "saved" } else { "unsaved" }, key)
        }
        ActionOutcome::Details {
            name,
            category,
            state,
            favorited,
        } => println!(
            "{}\nCategory: {} | State: {}{}",
            name,
            category,
            state,
            if favorited { " | Favorited" } else { "" }
        ),
        ActionOutcome::ViewOnMaps { name, state } => println!("maps: {}, {}", name, state),
    }
}

fn report(error: &ClientError) {
    match error {
        ClientError::Auth(message) => println!("error: {}", message),
        e if e.is_local() => {
            tracing::debug!(error = %e, "command skipped");
            println!("skipped: {}", e);
        }
        e => println!("failed: {}", crate::unpack_error(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_line_keeps_quoted_words_together() {
        assert_eq!(
            split_line(r#"fav "Golden Gate Bridge" CA 'Land mark'"#),
            vec!["fav", "Golden Gate Bridge", "CA", "Land mark"]
        );
        assert_eq!(split_line("   "), Vec::<String>::new());
        assert_eq!(split_line(r#"go """#), vec!["go", ""]);
    }

    #[test]
    fn lines_parse_into_commands() {
        assert_eq!(
            parse_line("search CA").unwrap(),
            Some(ShellCommand::Search {
                state: "CA".into(),
                category: "all".into()
            })
        );
        assert_eq!(parse_line("rm 42").unwrap(), Some(ShellCommand::Rm { id: "42".into() }));
        assert_eq!(parse_line("").unwrap(), None);
        assert!(parse_line("fav OnlyName").is_err());
    }
}
