use prost::DecodeError;

quick_error! {
    #[derive(Debug)]
    pub enum SequencerError {
        /// A commit notice arrived with no matching pending proposal.
        /// This is a protocol-ordering violation and is fatal.
        CommitWithoutProposal {
            display("commit notice without a pending proposal")
        }

        BadEnvelope(what: String) {
            display("malformed envelope: {}", what)
        }

        DecodeError(err: DecodeError) {
            from(err: DecodeError) -> (err)
            display("decode error: {:?}", err)
        }

        /// The stop flag was observed at a wait point; loops unwind with
        /// this and treat it as a clean exit.
        Stopped {
            display("sequencer stopping")
        }
    }
}
