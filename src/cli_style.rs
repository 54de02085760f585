use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Color as CtColor, Stylize};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

// ═══════════════════════════════════════════════════════════════════════════════
// Clap Styles
// ═══════════════════════════════════════════════════════════════════════════════

pub fn get_styles() -> Styles {
    Styles::styled()
        .usage(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
        )
        .header(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
        )
        .literal(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .invalid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .error(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Palette
// ═══════════════════════════════════════════════════════════════════════════════

pub mod colors {
    use crossterm::style::Color;

    pub const TOMATO: Color = Color::Rgb {
        r: 255,
        g: 99,
        b: 71,
    };
    pub const SAFFRON: Color = Color::Rgb {
        r: 244,
        g: 196,
        b: 48,
    };
    pub const BASIL: Color = Color::Rgb {
        r: 88,
        g: 190,
        b: 96,
    };
    pub const OLIVE: Color = Color::Rgb {
        r: 150,
        g: 160,
        b: 80,
    };
    pub const SKY: Color = Color::Rgb {
        r: 100,
        g: 149,
        b: 237,
    };
    pub const DIM: Color = Color::Rgb {
        r: 128,
        g: 128,
        b: 128,
    };
    pub const WHITE: Color = Color::Rgb {
        r: 255,
        g: 255,
        b: 255,
    };
}

mod glyphs {
    pub const ROUND_TOP_LEFT: &str = "╭";
    pub const ROUND_TOP_RIGHT: &str = "╮";
    pub const ROUND_BOTTOM_LEFT: &str = "╰";
    pub const ROUND_BOTTOM_RIGHT: &str = "╯";
    pub const HORIZONTAL: &str = "─";

    pub const BULLET: &str = "●";
    pub const BULLET_EMPTY: &str = "○";
    pub const ARROW_RIGHT: &str = "▶";
    pub const CHECK: &str = "✓";
    pub const CROSS_MARK: &str = "✗";
}

const SECTION_WIDTH: usize = 60;

// ═══════════════════════════════════════════════════════════════════════════════
// Status lines
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print_success(message: &str) {
    println!(
        " {} {}",
        glyphs::CHECK.with(colors::BASIL).bold(),
        message.with(colors::BASIL)
    );
}

pub fn print_error(message: &str) {
    println!(
        " {} {}",
        glyphs::CROSS_MARK.with(colors::TOMATO).bold(),
        message.with(colors::TOMATO)
    );
}

pub fn print_warning(message: &str) {
    println!(
        " {} {}",
        "⚠".with(colors::SAFFRON).bold(),
        message.with(colors::SAFFRON)
    );
}

pub fn print_info(message: &str) {
    println!(
        " {} {}",
        "ℹ".with(colors::SKY).bold(),
        message.with(colors::SKY)
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// Sections
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print_section_header(title: &str) {
    let title_len = title.width();
    let padding = SECTION_WIDTH.saturating_sub(title_len + 4) / 2;
    let rest = SECTION_WIDTH.saturating_sub(title_len + 4 + padding);

    println!();
    println!(
        "{}{} {} {}{}",
        glyphs::ROUND_TOP_LEFT.with(colors::OLIVE),
        glyphs::HORIZONTAL.repeat(padding).with(colors::OLIVE),
        title.with(colors::SAFFRON).bold().attribute(Attribute::Italic),
        glyphs::HORIZONTAL.repeat(rest).with(colors::OLIVE),
        glyphs::ROUND_TOP_RIGHT.with(colors::OLIVE),
    );
}

pub fn print_section_footer() {
    println!(
        "{}{}{}",
        glyphs::ROUND_BOTTOM_LEFT.with(colors::OLIVE),
        glyphs::HORIZONTAL.repeat(SECTION_WIDTH).with(colors::OLIVE),
        glyphs::ROUND_BOTTOM_RIGHT.with(colors::OLIVE),
    );
    println!();
}

pub fn print_key_value(key: &str, value: &str) {
    println!(
        "  {} {} {}",
        glyphs::BULLET.with(colors::OLIVE),
        format!("{}:", key).with(colors::DIM),
        value.with(colors::WHITE)
    );
}

pub fn print_list_item(item: &str, color: CtColor) {
    println!("  {}  {}", glyphs::ARROW_RIGHT.with(color), item.with(color));
}

pub fn print_empty_list(message: &str) {
    println!(
        "  {} {}",
        glyphs::BULLET_EMPTY.with(colors::DIM),
        message.with(colors::DIM).attribute(Attribute::Italic)
    );
}

/// Cuts `text` to at most `max` display columns, marking the cut with `…`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w >= max {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// Prompt
// ═══════════════════════════════════════════════════════════════════════════════

pub fn get_prompt(context: &str) -> String {
    format!(
        "{} {} ",
        context.with(colors::OLIVE),
        "❯".with(colors::TOMATO).bold(),
    )
}

pub fn print_welcome(db_path: &str, remote: bool, upload: bool) {
    let on_off = |enabled: bool| if enabled { "on" } else { "off" };
    print_section_header("recipebox");
    print_key_value("Database", db_path);
    print_key_value("Version", env!("CARGO_PKG_VERSION"));
    print_key_value("Remote sync", on_off(remote));
    print_key_value("Photo upload", on_off(upload));
    println!(
        "  {}",
        "Type 'help' for available commands".with(colors::DIM)
    );
    print_section_footer();
}

pub fn print_goodbye() {
    println!();
    println!("  {}", "Bye!".with(colors::SAFFRON).bold());
    println!();
}
