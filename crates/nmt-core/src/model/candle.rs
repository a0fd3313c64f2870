//! Adapter from a logits-producing candle backend to `SequenceModel`.
//!
//! The backend sees exactly what a fixed-length encoder-decoder expects:
//! a `[1, L]` source tensor once per sentence and a `[1, L]` right-padded
//! target tensor per step. The next-token distribution is the softmax of the
//! decoder output row at the last prefix position.

use candle_core::{DType, Device, IndexOp, Tensor};

use super::{Distribution, ModelError, SequenceModel};

/// The network side: anything that turns id tensors into logits.
pub trait LogitsBackend: Send + Sync {
    /// `source`: `[1, S]` u32 ids. Returns the encoder representation.
    fn encode(&self, source: &Tensor) -> candle_core::Result<Tensor>;

    /// `target`: `[1, L]` u32 ids. Returns `[1, L, V]` logits.
    fn decode(&self, target: &Tensor, encoded: &Tensor) -> candle_core::Result<Tensor>;
}

pub struct CandleModel<B> {
    backend: B,
    device: Device,
}

impl<B: LogitsBackend> CandleModel<B> {
    pub fn new(backend: B, device: Device) -> Self {
        Self { backend, device }
    }

    pub fn cpu(backend: B) -> Self {
        Self::new(backend, Device::Cpu)
    }

    fn ids_tensor(&self, ids: &[u32]) -> Result<Tensor, ModelError> {
        Tensor::new(ids, &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| ModelError::Backend(format!("input tensor: {e}")))
    }
}

impl<B: LogitsBackend> SequenceModel for CandleModel<B> {
    type State = Tensor;

    fn encode(&self, source: &[u32]) -> Result<Tensor, ModelError> {
        let input = self.ids_tensor(source)?;
        self.backend
            .encode(&input)
            .map_err(|e| ModelError::Backend(format!("encode failed: {e}")))
    }

    fn decode_step(
        &self,
        padded: &[u32],
        prefix_len: usize,
        state: &Tensor,
    ) -> Result<Distribution, ModelError> {
        if prefix_len == 0 || prefix_len > padded.len() {
            return Err(ModelError::PrefixLength {
                prefix_len,
                padded_len: padded.len(),
            });
        }
        let input = self.ids_tensor(padded)?;
        let logits = self
            .backend
            .decode(&input, state)
            .map_err(|e| ModelError::Backend(format!("decode failed: {e}")))?;
        let probs: Vec<f32> = logits
            .i((0, prefix_len - 1))
            .and_then(|row| row.to_dtype(DType::F32))
            .and_then(|row| candle_nn::ops::softmax_last_dim(&row))
            .and_then(|row| row.to_vec1())
            .map_err(|e| ModelError::Backend(format!("softmax at position {prefix_len}: {e}")))?;
        Distribution::new(probs)
    }
}
