// ============================================================
// Layer 5 — Multi-task Loss
// ============================================================
// total = weighting( CE(c1, y), CE(c2, y), consistency(o1, o2) )
//
// Consistency term (`--loss`):
//   cos   cosine-embedding loss, o1 and o2 pulled together
//         (target +1 for every pair)
//   mse   mean squared error between o1 and o2
//   none  no consistency term
//
// Weighting (`--loss_weight`):
//   fixed  w0·L0 + w1·L1 + w2·L2 with `--weight`
//   auto   Σ 0.5 / p_i² · L_i + ln(1 + p_i²), p_i learnable
//          (homoscedastic uncertainty weighting)
//
// Reference: Kendall et al. (2018), Multi-Task Learning Using
//            Uncertainty to Weigh Losses

use burn::{
    module::Param,
    nn::loss::{CrossEntropyLossConfig, MseLoss, Reduction},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use clap::ValueEnum;
use std::fmt;

use crate::ml::model::DualBranchOutput;

const COSINE_EPS: f64 = 1e-8;

/// Number of loss terms: two heads plus the consistency term.
pub const NUM_TERMS: usize = 3;

// ─── CLI-facing modes ─────────────────────────────────────────────────────────

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LossMode {
    Cos,
    Mse,
    None,
}

/// Flag spelling; also the suffix of the run directory name.
impl fmt::Display for LossMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_possible_value() {
            Some(value) => f.write_str(value.get_name()),
            None        => Ok(()),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightMode {
    Fixed,
    Auto,
}

// ─── Consistency term ─────────────────────────────────────────────────────────

/// Loss between the two auxiliary embeddings. Each variant carries
/// everything it needs; the cosine variant builds its own target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsistencyLoss {
    Cosine { margin: f64 },
    Mse,
    Disabled,
}

impl From<LossMode> for ConsistencyLoss {
    fn from(mode: LossMode) -> Self {
        match mode {
            LossMode::Cos  => ConsistencyLoss::Cosine { margin: 0.0 },
            LossMode::Mse  => ConsistencyLoss::Mse,
            LossMode::None => ConsistencyLoss::Disabled,
        }
    }
}

impl ConsistencyLoss {
    /// o1, o2: [batch, embed_dim] → scalar loss [1]
    pub fn forward<B: Backend>(&self, o1: Tensor<B, 2>, o2: Tensor<B, 2>) -> Tensor<B, 1> {
        match *self {
            ConsistencyLoss::Cosine { margin } => {
                let [batch, _] = o1.dims();
                let target = Tensor::<B, 1>::ones([batch], &o1.device());
                cosine_embedding_loss(o1, o2, target, margin)
            }
            ConsistencyLoss::Mse => MseLoss::new().forward(o1, o2, Reduction::Mean),
            ConsistencyLoss::Disabled => Tensor::zeros([1], &o1.device()),
        }
    }
}

/// Row-wise cosine similarity, [batch, dim] × [batch, dim] → [batch].
pub fn cosine_similarity<B: Backend>(x1: Tensor<B, 2>, x2: Tensor<B, 2>) -> Tensor<B, 1> {
    let dot = (x1.clone() * x2.clone()).sum_dim(1);
    let n1  = x1.powf_scalar(2.0).sum_dim(1).sqrt();
    let n2  = x2.powf_scalar(2.0).sum_dim(1).sqrt();
    (dot / (n1 * n2).clamp_min(COSINE_EPS)).squeeze::<1>(1)
}

/// Mean over the batch of
///   1 - cos(x1, x2)              where target = +1
///   max(0, cos(x1, x2) - margin) where target = -1
pub fn cosine_embedding_loss<B: Backend>(
    x1:     Tensor<B, 2>,
    x2:     Tensor<B, 2>,
    target: Tensor<B, 1>,
    margin: f64,
) -> Tensor<B, 1> {
    let cos = cosine_similarity(x1, x2);
    let pos = (target.clone() + 1.0) / 2.0;
    let neg = (target.neg() + 1.0) / 2.0;
    let pos_term = cos.clone().neg() + 1.0;
    let neg_term = (cos - margin).clamp_min(0.0);
    (pos * pos_term + neg * neg_term).mean()
}

// ─── Term weighting ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LossWeighting {
    Fixed([f64; NUM_TERMS]),
    Auto,
}

/// Learnable uncertainty weights. Lives next to the network in the
/// trained module so the optimiser updates it; ignored by `Fixed`.
#[derive(Module, Debug)]
pub struct LossBalancer<B: Backend> {
    pub params: Param<Tensor<B, 1>>,
}

impl<B: Backend> LossBalancer<B> {
    pub fn new(device: &B::Device) -> Self {
        Self { params: Param::from_tensor(Tensor::ones([NUM_TERMS], device)) }
    }

    /// Σ 0.5 / p_i² · L_i + ln(1 + p_i²) over the stacked terms [NUM_TERMS].
    pub fn combine(&self, terms: Tensor<B, 1>) -> Tensor<B, 1> {
        let p  = self.params.val();
        let p2 = p.clone() * p;
        let scaled = terms * (p2.clone().recip() * 0.5);
        let reg    = (p2 + 1.0).log();
        (scaled + reg).sum()
    }
}

// ─── Composite ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct MultiTaskLoss {
    pub consistency: ConsistencyLoss,
    pub weighting:   LossWeighting,
}

impl MultiTaskLoss {
    pub fn new(consistency: ConsistencyLoss, weighting: LossWeighting) -> Self {
        Self { consistency, weighting }
    }

    /// Scalar training loss for one batch.
    pub fn forward<B: Backend>(
        &self,
        output:   &DualBranchOutput<B>,
        labels:   Tensor<B, 1, Int>,
        balancer: &LossBalancer<B>,
    ) -> Tensor<B, 1> {
        let ce = CrossEntropyLossConfig::new().init(&output.c1.device());
        let l1  = ce.forward(output.c1.clone(), labels.clone());
        let l2  = ce.forward(output.c2.clone(), labels);
        let aux = self.consistency.forward(output.o1.clone(), output.o2.clone());

        match self.weighting {
            LossWeighting::Fixed([w1, w2, w3]) => l1 * w1 + l2 * w2 + aux * w3,
            LossWeighting::Auto => balancer.combine(Tensor::cat(vec![l1, l2, aux], 0)),
        }
    }
}
