use tokio::sync::mpsc;

use crate::chat::events::{Inbound, Outbound};

pub mod codec;
pub mod framed;
pub mod loopback;

pub use codec::{CodecError, CodecResult, FrameCodec};
pub use framed::{FrameChannel, bridge, frame_pair};
pub use loopback::{Agent, AgentError, EchoAgent, LoopbackServer};

/// The client's ends of the channel: emissions go out, protocol events come in.
pub struct ClientChannel {
    pub outbound: mpsc::UnboundedSender<Outbound>,
    pub inbound: mpsc::UnboundedReceiver<Inbound>,
}

/// The remote's ends of the channel, driven by a transport or the loopback agent.
pub struct RemoteChannel {
    pub outbound: mpsc::UnboundedReceiver<Outbound>,
    pub inbound: mpsc::UnboundedSender<Inbound>,
}

/// Creates a connected client/remote pair.
pub fn channel_pair() -> (ClientChannel, RemoteChannel) {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    (
        ClientChannel {
            outbound: outbound_tx,
            inbound: inbound_rx,
        },
        RemoteChannel {
            outbound: outbound_rx,
            inbound: inbound_tx,
        },
    )
}
