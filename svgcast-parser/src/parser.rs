//! VT/xterm escape sequence parser.
//!
//! A state machine over the byte stream, following the ECMA-48 layout of
//! states (ground, escape, CSI, OSC, DCS, SOS/PM/APC). It is built to:
//! - handle arbitrary chunk boundaries (streaming input)
//! - never panic on malformed input
//! - decode UTF-8, substituting U+FFFD for invalid sequences
//!
//! DCS, SOS, PM and APC strings are consumed and dropped: the renderer
//! has no use for them, but their payload must not leak into the grid.

use crate::action::{c0, c1, Action, CsiAction, EscAction, OscAction, MAX_PARAMS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    Escape,
    EscapeIntermediate,
    CsiEntry,
    CsiParam,
    CsiIntermediate,
    CsiIgnore,
    OscString,
    DcsEntry,
    DcsPassthrough,
    SosPmApcString,
}

const MAX_INTERMEDIATES: usize = 4;
const MAX_OSC_PAYLOAD: usize = 65536;

pub struct Parser {
    state: State,
    params: Vec<u16>,
    current_param: Option<u16>,
    intermediates: Vec<u8>,
    private_marker: Option<u8>,
    osc_payload: String,
    osc_command: u16,
    osc_command_done: bool,
    utf8_buffer: Vec<u8>,
    utf8_remaining: usize,
    saw_esc_in_string: bool,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Parser {
            state: State::Ground,
            params: Vec::with_capacity(MAX_PARAMS),
            current_param: None,
            intermediates: Vec::with_capacity(MAX_INTERMEDIATES),
            private_marker: None,
            osc_payload: String::new(),
            osc_command: 0,
            osc_command_done: false,
            utf8_buffer: Vec::with_capacity(4),
            utf8_remaining: 0,
            saw_esc_in_string: false,
        }
    }

    /// Parse a chunk of bytes, returning the completed actions.
    /// Sequences split across chunks complete on a later call.
    pub fn parse(&mut self, input: &[u8]) -> Vec<Action> {
        let mut actions = Vec::new();
        for &byte in input {
            self.advance(byte, &mut actions);
        }
        actions
    }

    pub fn reset(&mut self) {
        self.state = State::Ground;
        self.clear_sequence();
        self.osc_payload.clear();
        self.osc_command = 0;
        self.osc_command_done = false;
        self.utf8_buffer.clear();
        self.utf8_remaining = 0;
        self.saw_esc_in_string = false;
    }

    fn advance(&mut self, byte: u8, actions: &mut Vec<Action>) {
        // A pending multi-byte UTF-8 character takes priority in ground state
        if self.utf8_remaining > 0 {
            if byte & 0xC0 == 0x80 {
                self.utf8_buffer.push(byte);
                self.utf8_remaining -= 1;
                if self.utf8_remaining == 0 {
                    match std::str::from_utf8(&self.utf8_buffer) {
                        Ok(s) => {
                            for c in s.chars() {
                                actions.push(Action::Print(c));
                            }
                        }
                        Err(_) => actions.push(Action::Print('\u{FFFD}')),
                    }
                    self.utf8_buffer.clear();
                }
                return;
            }
            // Truncated sequence: emit the replacement and reprocess the byte
            actions.push(Action::Print('\u{FFFD}'));
            self.utf8_buffer.clear();
            self.utf8_remaining = 0;
        }

        if self.state == State::Ground && byte >= 0xC0 {
            let remaining = match byte {
                0xC2..=0xDF => 1,
                0xE0..=0xEF => 2,
                0xF0..=0xF4 => 3,
                _ => 0,
            };
            if remaining > 0 {
                self.utf8_buffer.clear();
                self.utf8_buffer.push(byte);
                self.utf8_remaining = remaining;
            } else {
                actions.push(Action::Print('\u{FFFD}'));
            }
            return;
        }

        if self.state == State::Ground && (0x80..0xA0).contains(&byte) {
            self.handle_c1(byte, actions);
            return;
        }

        match self.state {
            State::Ground => self.ground(byte, actions),
            State::Escape => self.escape(byte, actions),
            State::EscapeIntermediate => self.escape_intermediate(byte, actions),
            State::CsiEntry | State::CsiParam | State::CsiIntermediate => {
                self.csi(byte, actions)
            }
            State::CsiIgnore => self.csi_ignore(byte, actions),
            State::OscString => self.osc_string(byte, actions),
            State::DcsEntry => self.dcs_entry(byte),
            State::DcsPassthrough => self.dcs_passthrough(byte),
            State::SosPmApcString => self.sos_pm_apc_string(byte),
        }
    }

    fn handle_c1(&mut self, byte: u8, actions: &mut Vec<Action>) {
        match byte {
            c1::CSI => {
                self.clear_sequence();
                self.state = State::CsiEntry;
            }
            c1::OSC => self.begin_osc(),
            c1::DCS => {
                self.clear_sequence();
                self.state = State::DcsEntry;
            }
            c1::SOS | c1::PM | c1::APC => {
                self.saw_esc_in_string = false;
                self.state = State::SosPmApcString;
            }
            c1::ST => self.state = State::Ground,
            c1::IND => actions.push(Action::Esc(EscAction {
                intermediates: vec![],
                final_byte: b'D',
            })),
            c1::NEL => actions.push(Action::Esc(EscAction {
                intermediates: vec![],
                final_byte: b'E',
            })),
            c1::HTS => actions.push(Action::Esc(EscAction {
                intermediates: vec![],
                final_byte: b'H',
            })),
            c1::RI => actions.push(Action::Esc(EscAction {
                intermediates: vec![],
                final_byte: b'M',
            })),
            _ => {}
        }
    }

    fn ground(&mut self, byte: u8, actions: &mut Vec<Action>) {
        match byte {
            0x00..=0x1A | 0x1C..=0x1F => actions.push(Action::Control(byte)),
            c0::ESC => {
                self.clear_sequence();
                self.state = State::Escape;
            }
            0x20..=0x7E => actions.push(Action::Print(byte as char)),
            c0::DEL => {}
            _ => {}
        }
    }

    fn escape(&mut self, byte: u8, actions: &mut Vec<Action>) {
        match byte {
            0x00..=0x17 | 0x19 | 0x1C..=0x1F => actions.push(Action::Control(byte)),
            c0::CAN | c0::SUB => self.state = State::Ground,
            c0::ESC => self.clear_sequence(),
            0x20..=0x2F => {
                self.collect(byte);
                self.state = State::EscapeIntermediate;
            }
            b'[' => {
                self.clear_sequence();
                self.state = State::CsiEntry;
            }
            b']' => self.begin_osc(),
            b'P' => {
                self.clear_sequence();
                self.state = State::DcsEntry;
            }
            b'X' | b'^' | b'_' => {
                self.saw_esc_in_string = false;
                self.state = State::SosPmApcString;
            }
            0x30..=0x4F | 0x51..=0x57 | 0x59 | 0x5A | 0x5C | 0x60..=0x7E => {
                actions.push(Action::Esc(EscAction {
                    intermediates: std::mem::take(&mut self.intermediates),
                    final_byte: byte,
                }));
                self.state = State::Ground;
            }
            c0::DEL => {}
            _ => self.state = State::Ground,
        }
    }

    fn escape_intermediate(&mut self, byte: u8, actions: &mut Vec<Action>) {
        match byte {
            0x00..=0x17 | 0x19 | 0x1C..=0x1F => actions.push(Action::Control(byte)),
            c0::CAN | c0::SUB => self.state = State::Ground,
            c0::ESC => {
                self.clear_sequence();
                self.state = State::Escape;
            }
            0x20..=0x2F => self.collect(byte),
            0x30..=0x7E => {
                actions.push(Action::Esc(EscAction {
                    intermediates: std::mem::take(&mut self.intermediates),
                    final_byte: byte,
                }));
                self.state = State::Ground;
            }
            c0::DEL => {}
            _ => self.state = State::Ground,
        }
    }

    fn csi(&mut self, byte: u8, actions: &mut Vec<Action>) {
        match byte {
            0x00..=0x17 | 0x19 | 0x1C..=0x1F => actions.push(Action::Control(byte)),
            c0::CAN | c0::SUB => self.state = State::Ground,
            c0::ESC => {
                self.clear_sequence();
                self.state = State::Escape;
            }
            0x30..=0x39 => {
                if self.state == State::CsiIntermediate {
                    self.state = State::CsiIgnore;
                    return;
                }
                let digit = (byte - b'0') as u16;
                let current = self.current_param.unwrap_or(0);
                self.current_param =
                    Some(current.saturating_mul(10).saturating_add(digit));
                self.state = State::CsiParam;
            }
            // Sub-parameter colons are treated like separators; the SGR
            // handler reads 38:2:r:g:b and 38;2;r;g;b identically.
            b';' | b':' => {
                if self.state == State::CsiIntermediate {
                    self.state = State::CsiIgnore;
                    return;
                }
                self.push_param();
                self.state = State::CsiParam;
            }
            b'<' | b'=' | b'>' | b'?' => {
                if self.state == State::CsiEntry {
                    self.private_marker = Some(byte);
                    self.state = State::CsiParam;
                } else {
                    self.state = State::CsiIgnore;
                }
            }
            0x20..=0x2F => {
                self.collect(byte);
                self.state = State::CsiIntermediate;
            }
            0x40..=0x7E => {
                self.csi_dispatch(byte, actions);
                self.state = State::Ground;
            }
            c0::DEL => {}
            _ => self.state = State::CsiIgnore,
        }
    }

    fn csi_ignore(&mut self, byte: u8, actions: &mut Vec<Action>) {
        match byte {
            0x00..=0x17 | 0x19 | 0x1C..=0x1F => actions.push(Action::Control(byte)),
            c0::CAN | c0::SUB => self.state = State::Ground,
            c0::ESC => {
                self.clear_sequence();
                self.state = State::Escape;
            }
            0x40..=0x7E => self.state = State::Ground,
            _ => {}
        }
    }

    fn begin_osc(&mut self) {
        self.osc_payload.clear();
        self.osc_command = 0;
        self.osc_command_done = false;
        self.saw_esc_in_string = false;
        self.state = State::OscString;
    }

    fn osc_string(&mut self, byte: u8, actions: &mut Vec<Action>) {
        match byte {
            c0::BEL => {
                self.osc_dispatch(actions);
                self.state = State::Ground;
            }
            c0::ESC => self.saw_esc_in_string = true,
            c0::CAN | c0::SUB => self.state = State::Ground,
            c1::ST => {
                self.osc_dispatch(actions);
                self.state = State::Ground;
            }
            _ => {
                if self.saw_esc_in_string {
                    self.saw_esc_in_string = false;
                    if byte == b'\\' {
                        self.osc_dispatch(actions);
                        self.state = State::Ground;
                        return;
                    }
                }
                if !self.osc_command_done && byte.is_ascii_digit() {
                    self.osc_command = self
                        .osc_command
                        .saturating_mul(10)
                        .saturating_add((byte - b'0') as u16);
                } else if !self.osc_command_done && byte == b';' {
                    self.osc_command_done = true;
                } else if self.osc_payload.len() < MAX_OSC_PAYLOAD {
                    self.osc_command_done = true;
                    self.osc_payload.push(byte as char);
                }
            }
        }
    }

    fn dcs_entry(&mut self, byte: u8) {
        match byte {
            c0::CAN | c0::SUB => self.state = State::Ground,
            c0::ESC => {
                self.clear_sequence();
                self.state = State::Escape;
            }
            0x40..=0x7E => {
                self.saw_esc_in_string = false;
                self.state = State::DcsPassthrough;
            }
            _ => {}
        }
    }

    fn dcs_passthrough(&mut self, byte: u8) {
        match byte {
            c0::CAN | c0::SUB => self.state = State::Ground,
            c0::ESC => self.saw_esc_in_string = true,
            c1::ST => self.state = State::Ground,
            _ => {
                if self.saw_esc_in_string {
                    self.saw_esc_in_string = false;
                    if byte == b'\\' {
                        self.state = State::Ground;
                    }
                }
            }
        }
    }

    fn sos_pm_apc_string(&mut self, byte: u8) {
        match byte {
            c0::CAN | c0::SUB => self.state = State::Ground,
            c0::ESC => self.saw_esc_in_string = true,
            c1::ST => self.state = State::Ground,
            _ => {
                if self.saw_esc_in_string {
                    self.saw_esc_in_string = false;
                    if byte == b'\\' {
                        self.state = State::Ground;
                    }
                }
            }
        }
    }

    fn clear_sequence(&mut self) {
        self.params.clear();
        self.current_param = None;
        self.intermediates.clear();
        self.private_marker = None;
    }

    fn collect(&mut self, byte: u8) {
        if self.intermediates.len() < MAX_INTERMEDIATES {
            self.intermediates.push(byte);
        }
    }

    fn push_param(&mut self) {
        if self.params.len() < MAX_PARAMS {
            self.params.push(self.current_param.unwrap_or(0));
        }
        self.current_param = None;
    }

    fn csi_dispatch(&mut self, final_byte: u8, actions: &mut Vec<Action>) {
        if self.current_param.is_some() || !self.params.is_empty() {
            self.push_param();
        }
        actions.push(Action::Csi(CsiAction {
            params: std::mem::take(&mut self.params),
            intermediates: std::mem::take(&mut self.intermediates),
            final_byte,
            private_marker: self.private_marker.take(),
        }));
    }

    fn osc_dispatch(&mut self, actions: &mut Vec<Action>) {
        actions.push(Action::Osc(OscAction {
            command: self.osc_command,
            payload: std::mem::take(&mut self.osc_payload),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(input: &[u8]) -> Vec<Action> {
        Parser::new().parse(input)
    }

    #[test]
    fn test_print_ascii() {
        let actions = parse_all(b"Hello");
        assert_eq!(actions.len(), 5);
        assert_eq!(actions[0], Action::Print('H'));
        assert_eq!(actions[4], Action::Print('o'));
    }

    #[test]
    fn test_control_characters() {
        let actions = parse_all(b"\x07\x08\x09\x0A\x0D");
        assert_eq!(
            actions,
            vec![
                Action::Control(0x07),
                Action::Control(0x08),
                Action::Control(0x09),
                Action::Control(0x0A),
                Action::Control(0x0D),
            ]
        );
    }

    #[test]
    fn test_csi_cursor_up() {
        let actions = parse_all(b"\x1b[5A");
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            Action::Csi(csi) => {
                assert_eq!(csi.final_byte, b'A');
                assert_eq!(csi.params, vec![5]);
            }
            other => panic!("expected CSI, got {:?}", other),
        }
    }

    #[test]
    fn test_csi_cursor_position() {
        let actions = parse_all(b"\x1b[10;20H");
        match &actions[0] {
            Action::Csi(csi) => {
                assert_eq!(csi.final_byte, b'H');
                assert_eq!(csi.params, vec![10, 20]);
            }
            other => panic!("expected CSI, got {:?}", other),
        }
    }

    #[test]
    fn test_csi_no_params() {
        let actions = parse_all(b"\x1b[H");
        match &actions[0] {
            Action::Csi(csi) => assert!(csi.params.is_empty()),
            other => panic!("expected CSI, got {:?}", other),
        }
    }

    #[test]
    fn test_csi_empty_params() {
        let actions = parse_all(b"\x1b[;H");
        match &actions[0] {
            Action::Csi(csi) => assert_eq!(csi.params, vec![0, 0]),
            other => panic!("expected CSI, got {:?}", other),
        }
    }

    #[test]
    fn test_csi_private_mode() {
        let actions = parse_all(b"\x1b[?25h");
        match &actions[0] {
            Action::Csi(csi) => {
                assert_eq!(csi.final_byte, b'h');
                assert_eq!(csi.private_marker, Some(b'?'));
                assert_eq!(csi.params, vec![25]);
            }
            other => panic!("expected CSI, got {:?}", other),
        }
    }

    #[test]
    fn test_csi_sgr_colon_subparams() {
        let actions = parse_all(b"\x1b[38:2:10:20:30m");
        match &actions[0] {
            Action::Csi(csi) => assert_eq!(csi.params, vec![38, 2, 10, 20, 30]),
            other => panic!("expected CSI, got {:?}", other),
        }
    }

    #[test]
    fn test_esc_sequence() {
        let actions = parse_all(b"\x1b7");
        match &actions[0] {
            Action::Esc(esc) => assert_eq!(esc.final_byte, b'7'),
            other => panic!("expected ESC, got {:?}", other),
        }
    }

    #[test]
    fn test_esc_charset_designation() {
        let actions = parse_all(b"\x1b(B");
        match &actions[0] {
            Action::Esc(esc) => {
                assert_eq!(esc.intermediates, vec![b'(']);
                assert_eq!(esc.final_byte, b'B');
            }
            other => panic!("expected ESC, got {:?}", other),
        }
    }

    #[test]
    fn test_osc_title_bel() {
        let actions = parse_all(b"\x1b]0;My Title\x07");
        match &actions[0] {
            Action::Osc(osc) => {
                assert_eq!(osc.command, 0);
                assert_eq!(osc.payload, "My Title");
            }
            other => panic!("expected OSC, got {:?}", other),
        }
    }

    #[test]
    fn test_osc_with_st() {
        let actions = parse_all(b"\x1b]2;Window Title\x1b\\");
        match &actions[0] {
            Action::Osc(osc) => {
                assert_eq!(osc.command, 2);
                assert_eq!(osc.payload, "Window Title");
            }
            other => panic!("expected OSC, got {:?}", other),
        }
    }

    #[test]
    fn test_utf8_basic() {
        let actions = parse_all("Hello 世界".as_bytes());
        let chars: Vec<char> = actions
            .iter()
            .filter_map(|a| match a {
                Action::Print(c) => Some(*c),
                _ => None,
            })
            .collect();
        assert_eq!(chars, vec!['H', 'e', 'l', 'l', 'o', ' ', '世', '界']);
    }

    #[test]
    fn test_invalid_utf8() {
        let actions = parse_all(&[0xFF, b'a']);
        assert_eq!(
            actions,
            vec![Action::Print('\u{FFFD}'), Action::Print('a')]
        );
    }

    #[test]
    fn test_chunk_boundary() {
        let mut parser = Parser::new();
        assert!(parser.parse(b"\x1b[").is_empty());
        assert!(parser.parse(b"5").is_empty());
        let actions = parser.parse(b"A");
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            Action::Csi(csi) => {
                assert_eq!(csi.final_byte, b'A');
                assert_eq!(csi.params, vec![5]);
            }
            other => panic!("expected CSI, got {:?}", other),
        }
    }

    #[test]
    fn test_utf8_chunk_boundary() {
        let mut parser = Parser::new();
        let bytes = "中".as_bytes();
        assert!(parser.parse(&bytes[..1]).is_empty());
        let actions = parser.parse(&bytes[1..]);
        assert_eq!(actions, vec![Action::Print('中')]);
    }

    #[test]
    fn test_cancel_sequence() {
        let actions = parse_all(b"\x1b[\x18Hello");
        let prints: Vec<char> = actions
            .iter()
            .filter_map(|a| match a {
                Action::Print(c) => Some(*c),
                _ => None,
            })
            .collect();
        assert_eq!(prints, vec!['H', 'e', 'l', 'l', 'o']);
    }

    #[test]
    fn test_dcs_is_swallowed() {
        let actions = parse_all(b"\x1bPqpayload\x1b\\after");
        let prints: Vec<char> = actions
            .iter()
            .filter_map(|a| match a {
                Action::Print(c) => Some(*c),
                _ => None,
            })
            .collect();
        assert_eq!(prints, vec!['a', 'f', 't', 'e', 'r']);
    }

    #[test]
    fn test_param_overflow_is_clamped() {
        let actions = parse_all(b"\x1b[99999999999999A");
        match &actions[0] {
            Action::Csi(csi) => assert_eq!(csi.params, vec![u16::MAX]),
            other => panic!("expected CSI, got {:?}", other),
        }
    }
}
