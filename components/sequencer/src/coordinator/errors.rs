use storage::StorageError;

quick_error! {
    #[derive(Debug)]
    pub enum CoordinatorError {
        UnexpectedMessage(got: i32) {
            display("expected READ_RESULT, got message type {}", got)
        }

        Storage(err: StorageError) {
            from(err: StorageError) -> (err)
            display("storage error: {}", err)
        }
    }
}
