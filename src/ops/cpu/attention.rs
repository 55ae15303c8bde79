//! CPU implementation of attention operations.

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::ops::{AttentionOps, AttentionOptions};
use crate::runtime::cpu::{
    CpuClient,
    helpers::dispatch_accum,
    kernels::{AttentionGeometry, attention_kernel},
};
use crate::tensor::{Shape, Tensor};
use num_traits::NumCast;

impl AttentionOps for CpuClient {
    fn scaled_dot_product_attention<T: Element>(
        &self,
        q: &Tensor<T>,
        k: &Tensor<T>,
        v: &Tensor<T>,
        options: AttentionOptions,
    ) -> Result<Tensor<T>> {
        let (batch_dims, geometry) = validate_attention_shapes(q, k, v, options.causal)?;
        let scale = options
            .scale
            .unwrap_or_else(|| 1.0 / (geometry.head_dim as f64).sqrt());
        if !scale.is_finite() {
            return Err(Error::invalid_argument(
                "scale",
                format!("must be finite, got {scale}"),
            ));
        }

        let out_shape: Shape = batch_dims
            .iter()
            .copied()
            .chain([geometry.seq_q, geometry.value_dim])
            .collect();
        let mut out = vec![T::from_f64(0.0); out_shape.numel()];

        tracing::trace!(
            q = ?q.shape(),
            k = ?k.shape(),
            v = ?v.shape(),
            causal = options.causal,
            "scaled_dot_product_attention"
        );

        dispatch_accum!(self.accumulation_for(T::DTYPE), A => {
            let scale: A = NumCast::from(scale).ok_or_else(|| {
                Error::invalid_argument("scale", format!("{scale} is not representable"))
            })?;
            attention_kernel::<T, A>(
                self,
                q.as_slice(),
                k.as_slice(),
                v.as_slice(),
                &mut out,
                geometry,
                scale,
            );
        });

        Ok(Tensor::from_parts(out, out_shape))
    }
}

fn validate_attention_shapes<'a, T: Element>(
    q: &'a Tensor<T>,
    k: &Tensor<T>,
    v: &Tensor<T>,
    causal: bool,
) -> Result<(&'a [usize], AttentionGeometry)> {
    for (name, t) in [("q", q), ("k", k), ("v", v)] {
        if t.ndim() < 2 {
            return Err(Error::invalid_argument(
                name,
                format!("expected at least 2 dimensions, got shape {:?}", t.shape()),
            ));
        }
    }

    let (q_batch, q_tail) = q.shape().split_at(q.ndim() - 2);
    let (k_batch, k_tail) = k.shape().split_at(k.ndim() - 2);
    let (v_batch, v_tail) = v.shape().split_at(v.ndim() - 2);

    if q_batch != k_batch {
        return Err(Error::shape_mismatch(q_batch, k_batch));
    }
    if q_batch != v_batch {
        return Err(Error::shape_mismatch(q_batch, v_batch));
    }
    if q_tail[1] != k_tail[1] {
        return Err(Error::shape_mismatch(q.shape(), k.shape()));
    }
    if k_tail[0] != v_tail[0] {
        return Err(Error::shape_mismatch(k.shape(), v.shape()));
    }
    if k_tail[0] == 0 {
        return Err(Error::EmptyReduction {
            dim: k.ndim() - 2,
            op: "scaled_dot_product_attention",
        });
    }
    if q_tail[1] == 0 {
        return Err(Error::invalid_argument("q", "head dimension must be non-zero"));
    }

    Ok((
        q_batch,
        AttentionGeometry {
            seq_q: q_tail[0],
            seq_k: k_tail[0],
            head_dim: q_tail[1],
            value_dim: v_tail[1],
            causal,
        },
    ))
}
