use std::thread;
use std::time::Duration;

use clap::{App, Arg};

use cadence::setup::init_logger;
use cadence::Node;
use sequencer::conf::ClusterInfo;
use sequencer::transport::MemHub;

fn main() {
    // TODO add test of command line argument.
    let matches = App::new("cadenced")
        .version("0.0.1")
        .author("cadencedb developers")
        .about("deterministic replicated batch sequencer")
        .arg(
            Arg::with_name("cluster")
                .long("cluster")
                .takes_value(true)
                .required(true)
                .help("cluster config in yaml"),
        )
        .get_matches();

    let conffn = matches.value_of("cluster").unwrap();

    let logger = init_logger().unwrap();
    let info = ClusterInfo::from_file(conffn).unwrap();

    // every node of the cluster runs in this process, wired over a MemHub
    let hub = MemHub::new();
    let mut nodes = Vec::new();
    for id in 0..info.total_nodes() {
        let node = Node::start(info.clone(), id, hub.node(id), logger.clone()).unwrap();
        nodes.push(node);
    }

    println!("cadenced: {} nodes up", nodes.len());

    loop {
        thread::sleep(Duration::from_secs(3600));
    }
}
