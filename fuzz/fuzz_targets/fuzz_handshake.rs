#![no_main]

use libfuzzer_sys::fuzz_target;
use source_connector::identity::StaticIdentity;
use source_connector::protocol::{Connector, Listener, Message};
use source_connector::transport::ClientHandle;

fuzz_target!(|data: &[u8]| {
    // Feed arbitrary datagrams through the handshake
    let (handle, _rx) = ClientHandle::channel();
    let mut connector = Connector::new("fuzz", "", "1", 1, StaticIdentity::new(1, vec![1; 8]));
    connector.register(handle);

    for chunk in data.split(|b| *b == b'|') {
        let msg = Message::classify(chunk.to_vec());
        let _ = connector.receive(&msg, msg.sub_type());
    }
});
