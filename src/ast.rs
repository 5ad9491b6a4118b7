/// One executable stage: an argv plus its file redirections. The argv is
/// never empty once the builder has run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Command {
    pub argv: Vec<String>,
    pub input_file: Option<String>,
    pub output_file: Option<String>,
    pub append: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub stages: Vec<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And, // &&
    Or,  // ||
}

/// Pipelines joined left-to-right by `&&`/`||`.
#[derive(Debug, Clone, PartialEq)]
pub struct AndOrList {
    pub first: Pipeline,
    pub rest: Vec<(Connector, Pipeline)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SegmentKind {
    AndOr(AndOrList),
    Subshell(Vec<Segment>),
}

/// A `;`/`&`-delimited element of the input line. `text` keeps the segment
/// as typed for the job table.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub background: bool,
    pub text: String,
}
