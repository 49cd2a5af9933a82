use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("invalid junction orientation '{value}', must be '+', '-', 'F' or 'R'")]
    InvalidOrientation { value: String },
    #[error("invalid junction record {i}: {msg}")]
    InvalidJunctionRecord { i: usize, msg: String },
    #[error("contig {contig} not found in alignment header")]
    UnknownContig { contig: String },
    #[error("BAM record {name} is unmapped and cannot be used as assembly evidence")]
    UnmappedRecord { name: String },
    #[error("BAM record {name} cannot be used as assembly evidence: {reason}")]
    UnusableRecord { name: String, reason: String },
}

pub(crate) fn invalid_junction_record(i: usize, msg: &str) -> Error {
    Error::InvalidJunctionRecord {
        i,
        msg: msg.to_owned(),
    }
}
