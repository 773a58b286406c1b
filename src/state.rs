use crate::header::FieldHeader;

/// Where the multipart decoder is within the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DecodeStage {
    /// Skipping any preamble up to the first delimiter.
    FindingFirstBoundary,
    /// At a delimiter; deciding between another field and the terminal one.
    ScanningForMoreFields,
    ParsingHeader,
    ExtractingValue(FieldHeader),
    SpoolingFile(FieldHeader),
    Done,
}
