//! Terminal emulator adapter.
//!
//! Owns the screen and the parser exclusively and translates parsed
//! actions into screen operations. Nothing outside this type touches the
//! mutable emulator state; callers only get immutable snapshots, which
//! keeps frame immutability real.
//!
//! Unknown sequences are no-ops, logged at debug level.

use std::collections::BTreeSet;

use svgcast_core::cell::Attrs;
use svgcast_core::{Color, NamedColor, Rgb, Screen, ScreenSnapshot};
use svgcast_parser::{c0, Action, CsiAction, EscAction, OscAction, Parser};

/// Designatable character sets; only ASCII and the DEC special graphics
/// (line drawing) set are distinguished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Charset {
    Ascii,
    DecSpecialGraphics,
}

pub struct Terminal {
    screen: Screen,
    parser: Parser,
    charsets: [Charset; 2],
    active_charset: usize,
}

impl Terminal {
    pub fn new(cols: usize, rows: usize) -> Self {
        Terminal {
            screen: Screen::new(cols, rows),
            parser: Parser::new(),
            charsets: [Charset::Ascii; 2],
            active_charset: 0,
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Rows touched since the previous call
    pub fn take_dirty_rows(&mut self) -> BTreeSet<usize> {
        self.screen.take_dirty_rows()
    }

    /// Deep immutable copy of the current screen
    pub fn snapshot(&self) -> ScreenSnapshot {
        self.screen.snapshot()
    }

    /// Feed raw bytes from the session into the emulator
    pub fn process(&mut self, data: &[u8]) {
        let actions = self.parser.parse(data);
        for action in actions {
            self.handle_action(action);
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Print(c) => {
                let c = self.map_charset(c);
                self.screen.put_char(c);
            }
            Action::Control(byte) => self.handle_control(byte),
            Action::Csi(csi) => self.handle_csi(csi),
            Action::Esc(esc) => self.handle_esc(esc),
            Action::Osc(osc) => self.handle_osc(osc),
        }
    }

    fn map_charset(&self, c: char) -> char {
        if self.charsets[self.active_charset] == Charset::Ascii {
            return c;
        }
        // DEC special graphics: the line-drawing range 0x60..0x7E
        match c {
            'j' => '┘',
            'k' => '┐',
            'l' => '┌',
            'm' => '└',
            'n' => '┼',
            'q' => '─',
            't' => '├',
            'u' => '┤',
            'v' => '┴',
            'w' => '┬',
            'x' => '│',
            '`' => '◆',
            'a' => '▒',
            'f' => '°',
            'g' => '±',
            'o' => '⎺',
            's' => '⎽',
            '~' => '·',
            other => other,
        }
    }

    fn handle_control(&mut self, byte: u8) {
        match byte {
            c0::BEL => self.screen.bell(),
            c0::BS => self.screen.backspace(),
            c0::HT => self.screen.tab(),
            c0::LF | c0::VT | c0::FF => self.screen.linefeed(),
            c0::CR => self.screen.carriage_return(),
            c0::SO => self.active_charset = 1,
            c0::SI => self.active_charset = 0,
            other => {
                log::debug!("unhandled C0 control 0x{:02X}", other);
            }
        }
    }

    fn handle_csi(&mut self, csi: CsiAction) {
        if csi.private_marker == Some(b'?') {
            self.handle_csi_private(&csi);
            return;
        }
        if csi.private_marker.is_some() {
            log::debug!(
                "unhandled CSI with marker {:?} final {}",
                csi.private_marker,
                csi.final_byte as char
            );
            return;
        }
        if !csi.intermediates.is_empty() {
            self.handle_csi_intermediate(&csi);
            return;
        }

        match csi.final_byte {
            b'A' => self.screen.move_cursor_up(csi.param_or_one(0) as usize),
            b'B' | b'e' => self.screen.move_cursor_down(csi.param_or_one(0) as usize),
            b'C' | b'a' => self.screen.move_cursor_forward(csi.param_or_one(0) as usize),
            b'D' => self.screen.move_cursor_backward(csi.param_or_one(0) as usize),
            b'E' => {
                self.screen.move_cursor_down(csi.param_or_one(0) as usize);
                self.screen.carriage_return();
            }
            b'F' => {
                self.screen.move_cursor_up(csi.param_or_one(0) as usize);
                self.screen.carriage_return();
            }
            b'G' | b'`' => {
                let col = csi.param_or_one(0) as usize;
                self.screen.move_cursor_to_col(col.saturating_sub(1));
            }
            b'H' | b'f' => {
                let row = csi.param_or_one(0) as usize;
                let col = csi.param_or_one(1) as usize;
                self.screen
                    .move_cursor_to(row.saturating_sub(1), col.saturating_sub(1));
            }
            b'd' => {
                let row = csi.param_or_one(0) as usize;
                self.screen.move_cursor_to_row(row.saturating_sub(1));
            }
            b'J' => self.screen.erase_in_display(csi.param(0, 0)),
            b'K' => self.screen.erase_in_line(csi.param(0, 0)),
            b'X' => self.screen.erase_chars(csi.param_or_one(0) as usize),
            b'@' => self.screen.insert_chars(csi.param_or_one(0) as usize),
            b'P' => self.screen.delete_chars(csi.param_or_one(0) as usize),
            b'L' => self.screen.insert_lines(csi.param_or_one(0) as usize),
            b'M' => self.screen.delete_lines(csi.param_or_one(0) as usize),
            b'S' => self.screen.scroll_up(csi.param_or_one(0) as usize),
            b'T' => self.screen.scroll_down(csi.param_or_one(0) as usize),
            b'r' => {
                let top = csi.param_or_one(0) as usize;
                let bottom = csi.param(1, self.screen.rows() as u16) as usize;
                self.screen
                    .set_scroll_region(top.saturating_sub(1), bottom.saturating_sub(1));
            }
            b'm' => self.handle_sgr(&csi.params),
            b'h' => {
                for &param in &csi.params {
                    self.set_ansi_mode(param, true);
                }
            }
            b'l' => {
                for &param in &csi.params {
                    self.set_ansi_mode(param, false);
                }
            }
            b's' => self.screen.save_cursor(),
            b'u' => self.screen.restore_cursor(),
            b'g' => self.screen.clear_tab_stop(csi.param(0, 0)),
            other => {
                log::debug!(
                    "unhandled CSI: params={:?} final={}",
                    csi.params,
                    other as char
                );
            }
        }
    }

    fn handle_csi_private(&mut self, csi: &CsiAction) {
        let set = match csi.final_byte {
            b'h' => true,
            b'l' => false,
            other => {
                log::debug!("unhandled private CSI final {}", other as char);
                return;
            }
        };

        for &param in &csi.params {
            match param {
                6 => {
                    self.screen.modes.origin_mode = set;
                    self.screen.move_cursor_to(0, 0);
                }
                7 => self.screen.modes.autowrap = set,
                25 => self.screen.set_cursor_visible(set),
                47 | 1047 => {
                    if set {
                        self.screen.enter_alternate_screen();
                    } else {
                        self.screen.exit_alternate_screen();
                    }
                }
                1048 => {
                    if set {
                        self.screen.save_cursor();
                    } else {
                        self.screen.restore_cursor();
                    }
                }
                1049 => {
                    if set {
                        self.screen.save_cursor();
                        self.screen.enter_alternate_screen();
                        self.screen.erase_in_display(2);
                    } else {
                        self.screen.exit_alternate_screen();
                        self.screen.restore_cursor();
                    }
                }
                other => {
                    log::debug!("unhandled private mode {} (set={})", other, set);
                }
            }
        }
    }

    fn handle_csi_intermediate(&mut self, csi: &CsiAction) {
        match (csi.intermediates.as_slice(), csi.final_byte) {
            ([b'!'], b'p') => self.screen.reset(),
            _ => {
                log::debug!(
                    "unhandled CSI with intermediates {:?} final {}",
                    csi.intermediates,
                    csi.final_byte as char
                );
            }
        }
    }

    fn set_ansi_mode(&mut self, mode: u16, set: bool) {
        match mode {
            4 => self.screen.modes.insert_mode = set,
            20 => self.screen.modes.linefeed_mode = set,
            other => {
                log::debug!("unhandled ANSI mode {} (set={})", other, set);
            }
        }
    }

    /// SGR - Select Graphic Rendition. Bright variants (90-97, 100-107
    /// and indices 8..15) are used as-is; bold never upgrades 0..7.
    fn handle_sgr(&mut self, params: &[u16]) {
        if params.is_empty() {
            self.reset_pen();
            return;
        }

        let mut i = 0;
        while i < params.len() {
            let param = params[i];
            match param {
                0 => self.reset_pen(),
                1 => self.screen.attrs.insert(Attrs::BOLD),
                3 => self.screen.attrs.insert(Attrs::ITALIC),
                4 => self.screen.attrs.insert(Attrs::UNDERLINE),
                5 | 6 => self.screen.attrs.insert(Attrs::BLINK),
                7 => self.screen.attrs.insert(Attrs::INVERSE),
                9 => self.screen.attrs.insert(Attrs::STRIKETHROUGH),
                21 | 22 => self.screen.attrs.remove(Attrs::BOLD),
                23 => self.screen.attrs.remove(Attrs::ITALIC),
                24 => self.screen.attrs.remove(Attrs::UNDERLINE),
                25 => self.screen.attrs.remove(Attrs::BLINK),
                27 => self.screen.attrs.remove(Attrs::INVERSE),
                29 => self.screen.attrs.remove(Attrs::STRIKETHROUGH),
                30..=37 => {
                    if let Some(color) = NamedColor::from_sgr_normal((param - 30) as u8) {
                        self.screen.fg = Color::Named(color);
                    }
                }
                38 => {
                    if let Some((color, consumed)) = parse_extended_color(&params[i..]) {
                        self.screen.fg = color;
                        i += consumed - 1;
                    }
                }
                39 => self.screen.fg = Color::Default,
                40..=47 => {
                    if let Some(color) = NamedColor::from_sgr_normal((param - 40) as u8) {
                        self.screen.bg = Color::Named(color);
                    }
                }
                48 => {
                    if let Some((color, consumed)) = parse_extended_color(&params[i..]) {
                        self.screen.bg = color;
                        i += consumed - 1;
                    }
                }
                49 => self.screen.bg = Color::Default,
                90..=97 => {
                    if let Some(color) = NamedColor::from_sgr_bright((param - 90) as u8) {
                        self.screen.fg = Color::Named(color);
                    }
                }
                100..=107 => {
                    if let Some(color) = NamedColor::from_sgr_bright((param - 100) as u8) {
                        self.screen.bg = Color::Named(color);
                    }
                }
                other => {
                    log::debug!("unhandled SGR parameter {}", other);
                }
            }
            i += 1;
        }
    }

    fn reset_pen(&mut self) {
        self.screen.attrs = Attrs::empty();
        self.screen.fg = Color::Default;
        self.screen.bg = Color::Default;
    }

    fn handle_esc(&mut self, esc: EscAction) {
        match (esc.intermediates.as_slice(), esc.final_byte) {
            ([], b'7') => self.screen.save_cursor(),
            ([], b'8') => self.screen.restore_cursor(),
            ([], b'D') => self.screen.linefeed(),
            ([], b'E') => {
                self.screen.carriage_return();
                self.screen.linefeed();
            }
            ([], b'M') => self.screen.reverse_index(),
            ([], b'H') => self.screen.set_tab_stop(),
            ([], b'c') => {
                self.screen.reset();
                self.parser.reset();
                self.charsets = [Charset::Ascii; 2];
                self.active_charset = 0;
            }
            ([b'('], final_byte) => self.charsets[0] = parse_charset(final_byte),
            ([b')'], final_byte) => self.charsets[1] = parse_charset(final_byte),
            (intermediates, final_byte) => {
                log::debug!(
                    "unhandled ESC: intermediates={:?} final={}",
                    intermediates,
                    final_byte as char
                );
            }
        }
    }

    fn handle_osc(&mut self, osc: OscAction) {
        match osc.command {
            0 | 2 => self.screen.title = osc.payload,
            1 => {}
            other => {
                log::debug!("unhandled OSC {}: {:?}", other, osc.payload);
            }
        }
    }
}

/// Parse 38;5;N / 38;2;R;G;B (and the 48-prefixed background forms).
/// Returns the color and the number of parameters consumed.
fn parse_extended_color(params: &[u16]) -> Option<(Color, usize)> {
    match params.get(1)? {
        2 if params.len() >= 5 => {
            let rgb = Rgb::new(params[2] as u8, params[3] as u8, params[4] as u8);
            Some((Color::Rgb(rgb), 5))
        }
        5 if params.len() >= 3 => Some((Color::from_index(params[2] as u8), 3)),
        _ => None,
    }
}

fn parse_charset(final_byte: u8) -> Charset {
    match final_byte {
        b'0' => Charset::DecSpecialGraphics,
        _ => Charset::Ascii,
    }
}
