use sequencer::conf::ConfError;
use storage::StorageError;

quick_error! {
    #[derive(Debug)]
    pub enum NodeError {
        Conf(err: ConfError) {
            from(err: ConfError) -> (err)
            display("config error: {}", err)
        }

        Storage(err: StorageError) {
            from(err: StorageError) -> (err)
            display("storage error: {}", err)
        }
    }
}
