//! Line-oriented parser for Getty TGN result pages.
//!
//! The TGN search UI is plain HTML with one table row block per place. The
//! parser is a four-state machine fed one line at a time:
//!
//! ```text
//! LOOKING_FOR_ID_CODE      a line carrying `subjectid=NNNNN`
//! LOOKING_FOR_PLACE_NAME   the `<B>name</B>` line
//! LOOKING_FOR_HIERARCHY    the `(World, …, Nation, State, County) (kind)` line
//! LOOKING_FOR_EXTRAS_OR_END  optional "Name used" marker, then the block end
//! ```
//!
//! The machine is the only code coupled to the upstream layout; a page
//! redesign is absorbed here without touching the adapter or orchestrator.

use std::sync::LazyLock;

use regex::Regex;

static SUBJECT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"subjectid=(\d+)").expect("static regex"));

static BOLD_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<B>([^<]+)</B>").expect("static regex"));

/// The hierarchy is the parenthesized comma list that starts at the world
/// level; the place kind is a separate all-lowercase parenthetical.
static HIERARCHY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((?:Top of the TGN hierarchy|World)[^()]*\)").expect("static regex")
});

static PLACE_KIND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([a-z][a-z /-]*[a-z])\)").expect("static regex"));

static ALTERNATE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Name used").expect("static regex"));

static BLOCK_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<HR|</TABLE").expect("static regex"));

/// One place pulled off a preliminary result page.
#[derive(Debug, Clone, PartialEq)]
pub struct PreliminaryPlace {
    pub subject_id: i64,
    pub name: String,
    /// The raw comma-separated hierarchy, outer parens stripped.
    pub hierarchy: String,
    /// The lowercase place-kind keyword ("inhabited place", "peak", …).
    pub place_kind: String,
    /// The match came through an alternate (non-preferred) name.
    pub is_alternate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    LookingForIdCode,
    LookingForPlaceName,
    LookingForHierarchy,
    LookingForExtrasOrEnd,
}

#[derive(Debug, Default)]
struct Partial {
    subject_id: i64,
    name: String,
    hierarchy: String,
    place_kind: String,
    is_alternate: bool,
}

/// The page-parsing state machine.
pub struct GettyPageParser {
    state: State,
    current: Partial,
    places: Vec<PreliminaryPlace>,
}

impl Default for GettyPageParser {
    fn default() -> Self {
        Self::new()
    }
}

impl GettyPageParser {
    pub fn new() -> Self {
        Self {
            state: State::LookingForIdCode,
            current: Partial::default(),
            places: Vec::new(),
        }
    }

    /// Parse a whole page body.
    pub fn parse(body: &str) -> Vec<PreliminaryPlace> {
        let mut parser = Self::new();
        for line in body.lines() {
            parser.feed_line(line);
        }
        parser.finish()
    }

    fn begin_place(&mut self, subject_id: i64) {
        self.current = Partial {
            subject_id,
            ..Partial::default()
        };
        self.state = State::LookingForPlaceName;
    }

    fn finalize(&mut self) {
        if self.current.subject_id > 0 && !self.current.name.is_empty() {
            self.places.push(PreliminaryPlace {
                subject_id: self.current.subject_id,
                name: std::mem::take(&mut self.current.name),
                hierarchy: std::mem::take(&mut self.current.hierarchy),
                place_kind: std::mem::take(&mut self.current.place_kind),
                is_alternate: self.current.is_alternate,
            });
        }
        self.current = Partial::default();
        self.state = State::LookingForIdCode;
    }

    /// Feed one line of page text.
    pub fn feed_line(&mut self, line: &str) {
        match self.state {
            State::LookingForIdCode => {
                if let Some(caps) = SUBJECT_ID.captures(line) {
                    if let Ok(id) = caps[1].parse() {
                        self.begin_place(id);
                        // The name is often on the same line as the link.
                        self.try_name(line);
                    }
                }
            }
            State::LookingForPlaceName => {
                self.try_name(line);
            }
            State::LookingForHierarchy => {
                self.try_hierarchy(line);
            }
            State::LookingForExtrasOrEnd => {
                if ALTERNATE_MARKER.is_match(line) {
                    self.current.is_alternate = true;
                } else if let Some(caps) = SUBJECT_ID.captures(line) {
                    // A new block starts; the current place has been parsed.
                    let id = caps[1].parse().unwrap_or(0);
                    self.finalize();
                    if id > 0 {
                        self.begin_place(id);
                        self.try_name(line);
                    }
                } else if BLOCK_END.is_match(line) {
                    self.finalize();
                }
            }
        }
    }

    fn try_name(&mut self, line: &str) {
        if let Some(caps) = BOLD_NAME.captures(line) {
            self.current.name = caps[1].trim().to_string();
            self.state = State::LookingForHierarchy;
            // Hierarchy occasionally shares the name's line.
            self.try_hierarchy(line);
        }
    }

    fn try_hierarchy(&mut self, line: &str) {
        if let Some(m) = HIERARCHY.find(line) {
            let inner = &line[m.start() + 1..m.end() - 1];
            self.current.hierarchy = inner.trim().to_string();
            if let Some(kind) = PLACE_KIND
                .captures_iter(&line[m.end()..])
                .map(|c| c[1].to_string())
                .next()
            {
                self.current.place_kind = kind;
            }
            self.state = State::LookingForExtrasOrEnd;
        }
    }

    /// Flush the machine and return everything parsed.
    pub fn finish(mut self) -> Vec<PreliminaryPlace> {
        self.finalize();
        self.places
    }
}
