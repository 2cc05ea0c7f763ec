quick_error! {
    #[derive(Debug)]
    pub enum ConfError {
        BadYaml(err: serde_yaml::Error) {
            from(err: serde_yaml::Error) -> (err)
            display("invalid cluster yaml: {}", err)
        }

        IoError(err: std::io::Error) {
            from(err: std::io::Error) -> (err)
            display("{}", err)
        }

        BadClusterShape(what: String) {
            display("bad cluster shape: {}", what)
        }

        NoSuchNode(node: u64, total: u64) {
            from(ids: (u64, u64)) -> (ids.0, ids.1)
            display("node {} is not in a cluster of {} nodes", node, total)
        }
    }
}
