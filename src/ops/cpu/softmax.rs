//! CPU implementation of softmax operations.

use crate::dtype::Element;
use crate::error::Result;
use crate::ops::SoftmaxOps;
use crate::ops::online::{Accum, OnlineSoftmaxState, SoftmaxKind};
use crate::ops::plan::{ReductionPlan, plan_reduction};
use crate::runtime::cpu::{
    CpuClient,
    helpers::dispatch_accum,
    kernels::{softmax_kernel, statistics_kernel},
};
use crate::tensor::{ReduceLayout, Tensor};

/// SoftmaxOps implementation for CPU runtime.
impl SoftmaxOps for CpuClient {
    fn softmax<T: Element>(&self, a: &Tensor<T>, dim: isize) -> Result<Tensor<T>> {
        normalize_impl(self, a, dim, SoftmaxKind::Softmax)
    }

    fn log_softmax<T: Element>(&self, a: &Tensor<T>, dim: isize) -> Result<Tensor<T>> {
        normalize_impl(self, a, dim, SoftmaxKind::LogSoftmax)
    }

    fn prepare_softmax<T: Element>(
        &self,
        a: &Tensor<T>,
        dim: isize,
    ) -> Result<(Tensor<T>, Tensor<T>)> {
        let (layout, stats) = statistics_impl(self, a, dim, "prepare_softmax")?;
        let out_shape = a.shape_ref().reduced(layout.dim, true);
        let (max, sum) = stats.into_iter().unzip();
        Ok((
            Tensor::from_parts(max, out_shape.clone()),
            Tensor::from_parts(sum, out_shape),
        ))
    }

    fn logsumexp<T: Element>(
        &self,
        a: &Tensor<T>,
        dim: isize,
        keepdim: bool,
    ) -> Result<Tensor<T>> {
        let (layout, plan) = layout_and_plan(self, a, dim, "logsumexp")?;

        let data: Vec<T> = dispatch_accum!(self.accumulation_for(T::DTYPE), A => {
            statistics_kernel::<T, A>(self, a.as_slice(), &layout, &plan)
                .into_iter()
                .map(|s| s.log_sum_exp().store())
                .collect()
        });

        Ok(Tensor::from_parts(
            data,
            a.shape_ref().reduced(layout.dim, keepdim),
        ))
    }
}

fn layout_and_plan<T: Element>(
    client: &CpuClient,
    a: &Tensor<T>,
    dim: isize,
    op: &'static str,
) -> Result<(ReduceLayout, ReductionPlan)> {
    let layout = ReduceLayout::new(a.shape(), dim, op)?;
    let plan = plan_reduction(&layout, client.config());
    tracing::trace!(op, shape = ?a.shape(), dtype = %T::DTYPE, dim = layout.dim, "softmax dispatch");
    Ok((layout, plan))
}

fn normalize_impl<T: Element>(
    client: &CpuClient,
    a: &Tensor<T>,
    dim: isize,
    kind: SoftmaxKind,
) -> Result<Tensor<T>> {
    let (layout, plan) = layout_and_plan(client, a, dim, kind.op_name())?;
    let mut out = a.to_vec();

    dispatch_accum!(client.accumulation_for(T::DTYPE), A => {
        softmax_kernel::<T, A>(client, a.as_slice(), &mut out, &layout, &plan, kind);
    });

    Ok(Tensor::from_parts(out, a.shape_ref().clone()))
}

/// Per-row statistics, narrowed to the element type
fn statistics_impl<T: Element>(
    client: &CpuClient,
    a: &Tensor<T>,
    dim: isize,
    op: &'static str,
) -> Result<(ReduceLayout, Vec<(T, T)>)> {
    let (layout, plan) = layout_and_plan(client, a, dim, op)?;

    let stats = dispatch_accum!(client.accumulation_for(T::DTYPE), A => {
        narrow(statistics_kernel::<T, A>(client, a.as_slice(), &layout, &plan))
    });

    Ok((layout, stats))
}

fn narrow<T: Element, A: Accum>(stats: Vec<OnlineSoftmaxState<A>>) -> Vec<(T, T)> {
    stats
        .into_iter()
        .map(|s| (s.max.store(), s.sum.store()))
        .collect()
}
