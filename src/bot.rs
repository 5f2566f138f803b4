//! SAARTHI-BOT: a stateless keyword responder for the help widget.

use axum::{routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::state::AppState;

pub const GREETING: &str =
    "Hi, I am SAARTHI-BOT. Ask me anything about Skillसारथी and how this prototype works.";

pub const QUICK_QUESTIONS: [&str; 7] = [
    "What are Saarthi Tokens?",
    "How do I earn tokens?",
    "How does the dashboard work?",
    "What can I do on my profile?",
    "How do I post a request?",
    "How do I offer my services?",
    "What is the difference between client and Saarthi?",
];

const FALLBACK: &str = "I am SAARTHI-BOT. I can explain Skillसारथी features like Saarthi Tokens, roles, dashboard, profile, LinkedIn connect, and the light/dark theme toggle. Try asking \"What are Saarthi Tokens?\" or \"What can I do on the profile page?\".";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Bot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub from: Speaker,
    pub text: String,
}

/// A rule fires when every group has at least one keyword in the message.
struct Rule {
    all_of: &'static [&'static [&'static str]],
    reply: &'static str,
}

// Order matters: the first matching rule wins.
const RULES: &[Rule] = &[
    Rule {
        all_of: &[&["token"], &["what", "are"]],
        reply: "Saarthi Tokens (ST) are the credits you use instead of money. You earn them by helping others and spend them to request work from Saarthis. New users start with 120 tokens!",
    },
    Rule {
        all_of: &[&["earn"]],
        reply: EARN,
    },
    Rule {
        all_of: &[&["how"], &["token"]],
        reply: EARN,
    },
    Rule {
        all_of: &[&["dashboard"]],
        reply: "The dashboard shows your wallet balance, tokens earned and spent, and lets you switch between client view (your requests) and Saarthi view (services you offer). It's your central hub for managing activity.",
    },
    Rule {
        all_of: &[&["profile"]],
        reply: "On your Profile tab you can see your requests, manage applicants (approve/deny), edit your experience overview, connect LinkedIn, set communication preferences, and view reviews.",
    },
    Rule {
        all_of: &[&["post"], &["request"]],
        reply: "Go to \"Post a new request\" from the dashboard or navigation. Fill in the title, category, description, and set your token budget. Others can then see and apply to help with your request.",
    },
    Rule {
        all_of: &[&["offer"]],
        reply: OFFER,
    },
    Rule {
        all_of: &[&["service"], &["how"]],
        reply: OFFER,
    },
    Rule {
        all_of: &[&["difference"]],
        reply: DIFFERENCE,
    },
    Rule {
        all_of: &[&["client"], &["saarthi"]],
        reply: DIFFERENCE,
    },
    Rule {
        all_of: &[&["token"]],
        reply: "Saarthi Tokens (ST) are the credits you use instead of money. You earn them by helping others and spend them to request work from Saarthis.",
    },
    Rule {
        all_of: &[&["role", "client", "saarthi"]],
        reply: "Skillसारथी has two main roles: clients who post requests and Saarthis who fulfil them. You can switch views in the dashboard to see both sides.",
    },
    Rule {
        all_of: &[&["theme", "dark", "light"]],
        reply: "Use the theme toggle in the top-right header to switch between light and dark mode. Your choice is saved for your next visit.",
    },
    Rule {
        all_of: &[&["linkedin"]],
        reply: "The LinkedIn button on your profile is a demo that simulates connecting your LinkedIn profile to Skillसारथी.",
    },
    Rule {
        all_of: &[&["request", "explore"]],
        reply: "From Explore you can browse Saarthi services or open requests to fulfil. From the dashboard/profile you can manage your own requests and applicants.",
    },
    Rule {
        all_of: &[&["login", "register", "auth"]],
        reply: "You can register and log in with email and password. After login, your token balance, dashboard, and profile become active.",
    },
];

const EARN: &str = "You earn Saarthi Tokens by completing work for others. When someone requests your service or accepts your offer, you receive tokens as payment. The amount depends on the work complexity and your skill tier.";
const OFFER: &str = "Click \"Publish a new service\" from the dashboard. Describe what you can help with, set your token price, choose a category and skill tier. Your service will appear in the Explore section.";
const DIFFERENCE: &str = "Clients post requests when they need help and spend tokens. Saarthis offer services or respond to requests and earn tokens. You can be both! Use the dashboard toggle to switch views.";

/// Answer to a single message.
pub fn answer(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    RULES
        .iter()
        .find(|rule| {
            rule.all_of
                .iter()
                .all(|group| group.iter().any(|kw| lower.contains(kw)))
        })
        .map(|rule| rule.reply)
        .unwrap_or(FALLBACK)
}

/// Reply to the latest user message of a conversation; greets when the user
/// has not said anything yet.
pub fn reply(history: &[ChatMessage]) -> String {
    history
        .iter()
        .rev()
        .find(|m| m.from == Speaker::User && !m.text.trim().is_empty())
        .map(|m| answer(&m.text))
        .unwrap_or(GREETING)
        .to_string()
}

#[derive(Debug, Serialize)]
pub struct BotIntro {
    pub greeting: &'static str,
    pub questions: [&'static str; 7],
}

#[derive(Debug, Deserialize)]
pub struct BotRequest {
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct BotReply {
    pub reply: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/bot", get(intro).post(chat))
}

async fn intro() -> Json<BotIntro> {
    Json(BotIntro {
        greeting: GREETING,
        questions: QUICK_QUESTIONS,
    })
}

#[instrument(skip_all)]
async fn chat(Json(body): Json<BotRequest>) -> Json<BotReply> {
    Json(BotReply {
        reply: reply(&body.history),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(text: &str) -> ChatMessage {
        ChatMessage {
            from: Speaker::User,
            text: text.into(),
        }
    }

    #[test]
    fn every_quick_question_has_a_specific_answer() {
        for q in QUICK_QUESTIONS {
            assert_ne!(answer(q), FALLBACK, "{q}");
        }
    }

    #[test]
    fn keyword_precedence() {
        assert!(answer("What are Saarthi Tokens?").contains("New users start with 120 tokens"));
        assert_eq!(answer("How do I earn tokens?"), EARN);
        assert!(answer("How does the dashboard work?").starts_with("The dashboard"));
        assert!(answer("How do I post a request?").starts_with("Go to"));
        assert_eq!(answer("How do I offer my services?"), OFFER);
        assert_eq!(answer("What is the difference between client and Saarthi?"), DIFFERENCE);
        assert!(answer("switch to DARK mode").contains("theme toggle"));
        assert!(answer("tell me about linkedin").contains("LinkedIn button"));
        assert!(answer("can I register?").starts_with("You can register"));
        assert_eq!(answer("hello there"), FALLBACK);
    }

    #[test]
    fn reply_uses_latest_user_message() {
        let history = vec![
            user("tell me about the dashboard"),
            ChatMessage {
                from: Speaker::Bot,
                text: "The dashboard shows ...".into(),
            },
            user("and linkedin?"),
        ];
        assert!(reply(&history).contains("LinkedIn button"));
    }

    #[test]
    fn reply_greets_empty_history() {
        assert_eq!(reply(&[]), GREETING);
        let only_bot = vec![ChatMessage {
            from: Speaker::Bot,
            text: "hi".into(),
        }];
        assert_eq!(reply(&only_bot), GREETING);
    }
}
