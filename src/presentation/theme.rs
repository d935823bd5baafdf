use colored::Colorize;

pub struct Theme {
    pub title: fn(&str) -> String,
    pub key: fn(&str) -> String,
    pub value: fn(&str) -> String,
    pub line: fn(&str) -> String,
    pub info: fn(&str) -> String,
    pub success: fn(&str) -> String,
    pub warning: fn(&str) -> String,
    pub error: fn(&str) -> String,
}

impl Theme {
    pub fn from_name(name: &str) -> Self {
        match name {
            "light" | "" => Self::light(),
            "dark" => Self::dark(),
            "plain" => Self::plain(),
            _ => {
                eprintln!("{}", format!("✘ Unknown theme: {}", name).red());
                Self::light()
            }
        }
    }

    fn light() -> Self {
        Self {
            title: |s| s.blue().bold().underline().to_string(),
            key: |s| s.cyan().to_string(),
            value: |s| s.normal().to_string(),
            line: |s| s.bright_black().dimmed().to_string(),
            info: |s| s.blue().to_string(),
            success: |s| s.green().to_string(),
            warning: |s| s.yellow().to_string(),
            error: |s| s.red().to_string(),
        }
    }

    fn dark() -> Self {
        Self {
            title: |s| s.bright_magenta().bold().underline().to_string(),
            key: |s| s.bright_cyan().to_string(),
            value: |s| s.bright_white().to_string(),
            line: |s| s.bright_black().dimmed().to_string(),
            info: |s| s.bright_blue().to_string(),
            success: |s| s.bright_green().to_string(),
            warning: |s| s.bright_yellow().to_string(),
            error: |s| s.bright_red().bold().to_string(),
        }
    }

    fn plain() -> Self {
        Self {
            title: |s| s.to_string(),
            key: |s| s.to_string(),
            value: |s| s.to_string(),
            line: |s| s.to_string(),
            info: |s| s.to_string(),
            success: |s| s.to_string(),
            warning: |s| s.to_string(),
            error: |s| s.to_string(),
        }
    }
}
