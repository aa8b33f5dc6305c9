use nu_ansi_term::{Color, Style};

fn styled(color: Color, text: &str, is_bold: bool) -> String {
    let style = if is_bold {
        color.bold()
    } else {
        Style::new().fg(color)
    };
    style.paint(text).to_string()
}

pub fn red(text: &str) -> String {
    styled(Color::Red, text, false)
}

pub fn green(text: &str) -> String {
    styled(Color::Green, text, false)
}

pub fn bold_cyan(text: &str) -> String {
    styled(Color::Cyan, text, true)
}
