use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

use docqa_core::error::{Error, Result};

/// XLM-RoBERTa `<pad>` token id.
pub const PAD_ID: u32 = 1;

/// Encode `texts` as one `[B, T]` batch: truncated to `max_len`, right-padded to the
/// longest sequence. Returns `(input_ids, attention_mask)`.
pub fn tokenize_batch_on_device(tokenizer: &Tokenizer, texts: &[String], max_len: usize, device: &Device) -> Result<(Tensor, Tensor)> {
    let mut rows = Vec::with_capacity(texts.len());
    for text in texts {
        let enc = tokenizer.encode(text.as_str(), true).map_err(|e| Error::embedding(format!("tokenization failed: {e}")))?;
        let mut ids = enc.get_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        ids.truncate(max_len);
        mask.truncate(max_len);
        rows.push((ids, mask));
    }
    let width = rows.iter().map(|(ids, _)| ids.len()).max().unwrap_or(0).max(1);
    let mut all_ids = Vec::with_capacity(rows.len() * width);
    let mut all_mask = Vec::with_capacity(rows.len() * width);
    for (ids, mask) in rows {
        let pad = width - ids.len();
        all_ids.extend(ids.into_iter().chain(std::iter::repeat(PAD_ID).take(pad)));
        all_mask.extend(mask.into_iter().chain(std::iter::repeat(0).take(pad)));
    }
    let batch = texts.len();
    let input_ids = Tensor::from_vec(all_ids, (batch, width), device).map_err(Error::embedding)?;
    let attention_mask = Tensor::from_vec(all_mask, (batch, width), device).map_err(Error::embedding)?;
    Ok((input_ids, attention_mask))
}
