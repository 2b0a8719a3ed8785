//! User-agent string parsing
//!
//! Extracts browser (or client) name and version, operating system, device
//! category and a crawler flag. Fields that cannot be recognized stay empty.

use woothee::parser::Parser;

const UNKNOWN: &str = "UNKNOWN";
const CRAWLER_CATEGORY: &str = "crawler";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAgent {
    pub name: String,
    pub version: String,
    pub os: String,
    pub os_version: String,
    pub device: String,
    pub bot: bool,
}

pub fn parse(ua: &str) -> UserAgent {
    let Some(result) = Parser::new().parse(ua) else {
        return UserAgent::default();
    };

    let bot = result.category == CRAWLER_CATEGORY;
    UserAgent {
        name: known(&result.name),
        version: known(&result.version),
        os: known(&result.os),
        os_version: known(&result.os_version),
        device: if bot {
            String::new()
        } else {
            known(&result.category)
        },
        bot,
    }
}

fn known(value: &str) -> String {
    if value == UNKNOWN {
        String::new()
    } else {
        value.to_string()
    }
}
