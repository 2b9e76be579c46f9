use tokio::sync::mpsc;

use super::RemoteChannel;
use super::codec::FrameCodec;

/// One side of a text-frame link.
pub struct FrameChannel {
    pub tx: mpsc::UnboundedSender<String>,
    pub rx: mpsc::UnboundedReceiver<String>,
}

/// Creates two connected frame ends; what one sends the other receives.
pub fn frame_pair() -> (FrameChannel, FrameChannel) {
    let (left_tx, right_rx) = mpsc::unbounded_channel();
    let (right_tx, left_rx) = mpsc::unbounded_channel();
    (
        FrameChannel {
            tx: left_tx,
            rx: left_rx,
        },
        FrameChannel {
            tx: right_tx,
            rx: right_rx,
        },
    )
}

/// Carries the client's typed events over a frame link.
///
/// Emissions are encoded onto the wire; frames from the wire are decoded into
/// protocol events. Frames that fail to decode are logged and dropped. Runs
/// until either the client or the peer hangs up.
pub async fn bridge(codec: FrameCodec, mut remote: RemoteChannel, mut wire: FrameChannel) {
    loop {
        tokio::select! {
            event = remote.outbound.recv() => {
                let Some(event) = event else {
                    tracing::debug!("client closed outbound channel; closing frame link");
                    break;
                };
                match codec.encode_outbound(&event) {
                    Ok(frame) => {
                        if wire.tx.send(frame).is_err() {
                            tracing::warn!(
                                event = event.event_name(),
                                "peer hung up; emission dropped"
                            );
                            break;
                        }
                    }
                    Err(error) => tracing::warn!(error = %error, "failed to encode emission"),
                }
            }
            frame = wire.rx.recv() => {
                let Some(frame) = frame else {
                    tracing::warn!(namespace = codec.namespace(), "peer closed the frame link");
                    break;
                };
                match codec.decode_inbound(&frame) {
                    Ok(event) => {
                        if remote.inbound.send(event).is_err() {
                            tracing::debug!("client dropped inbound channel; closing frame link");
                            break;
                        }
                    }
                    Err(error) => {
                        tracing::warn!(error = %error, frame = %frame, "dropping undecodable frame");
                    }
                }
            }
        }
    }
}
