use burn::{
    nn::{
        conv::{Conv1d, Conv1dConfig},
        pool::{
            AdaptiveAvgPool1d, AdaptiveAvgPool1dConfig,
            MaxPool1d, MaxPool1dConfig,
        },
        BatchNorm, BatchNormConfig,
        Dropout, DropoutConfig,
        Linear, LinearConfig,
        PaddingConfig1d, Relu,
    },
    prelude::*,
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct DualBranchConfig {
    /// Sleep stages: W, N1, N2, N3, REM
    #[config(default = 5)]
    pub num_classes: usize,
    /// Width of the auxiliary embedding each branch emits
    #[config(default = 128)]
    pub embed_dim:   usize,
    #[config(default = 0.5)]
    pub dropout:     f64,
    /// Temporal length after adaptive pooling, before flattening
    #[config(default = 8)]
    pub pooled_len:  usize,
}

const FILTERS: usize = 64;

impl DualBranchConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DualBranchNet<B> {
        DualBranchNet {
            eog_branch: self.build_encoder(device),
            eeg_branch: self.build_encoder(device),
            eog_head:   LinearConfig::new(self.embed_dim, self.num_classes).init(device),
            eeg_head:   LinearConfig::new(self.embed_dim, self.num_classes).init(device),
        }
    }

    /// Wide strided first conv picks up slow waves; two narrow convs
    /// follow. Adaptive pooling makes the flatten width independent
    /// of the window length.
    fn build_encoder<B: Backend>(&self, device: &B::Device) -> SignalEncoder<B> {
        let conv1 = Conv1dConfig::new(1, FILTERS / 2, 50)
            .with_stride(6)
            .with_padding(PaddingConfig1d::Explicit(24))
            .init(device);
        let conv2 = Conv1dConfig::new(FILTERS / 2, FILTERS, 7)
            .with_padding(PaddingConfig1d::Explicit(3))
            .init(device);
        let conv3 = Conv1dConfig::new(FILTERS, FILTERS, 7)
            .with_padding(PaddingConfig1d::Explicit(3))
            .init(device);
        SignalEncoder {
            conv1,
            norm1: BatchNormConfig::new(FILTERS / 2).init(device),
            pool1: MaxPool1dConfig::new(8).with_stride(8).init(),
            conv2,
            norm2: BatchNormConfig::new(FILTERS).init(device),
            conv3,
            norm3: BatchNormConfig::new(FILTERS).init(device),
            pool2: MaxPool1dConfig::new(4).with_stride(4).init(),
            adaptive: AdaptiveAvgPool1dConfig::new(self.pooled_len).init(),
            project: LinearConfig::new(FILTERS * self.pooled_len, self.embed_dim).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            activation: Relu::new(),
        }
    }
}

#[derive(Module, Debug)]
pub struct SignalEncoder<B: Backend> {
    pub conv1:      Conv1d<B>,
    pub norm1:      BatchNorm<B, 1>,
    pub pool1:      MaxPool1d,
    pub conv2:      Conv1d<B>,
    pub norm2:      BatchNorm<B, 1>,
    pub conv3:      Conv1d<B>,
    pub norm3:      BatchNorm<B, 1>,
    pub pool2:      MaxPool1d,
    pub adaptive:   AdaptiveAvgPool1d,
    pub project:    Linear<B>,
    pub dropout:    Dropout,
    pub activation: Relu,
}

impl<B: Backend> SignalEncoder<B> {
    /// x: [batch, 1, samples] → [batch, embed_dim]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let x = self.activation.forward(self.norm1.forward(self.conv1.forward(x)));
        let x = self.dropout.forward(self.pool1.forward(x));

        let x = self.activation.forward(self.norm2.forward(self.conv2.forward(x)));
        let x = self.activation.forward(self.norm3.forward(self.conv3.forward(x)));
        let x = self.pool2.forward(x);

        let x = self.adaptive.forward(x); // [batch, FILTERS, pooled_len]
        let x = x.flatten::<2>(1, 2);
        self.project.forward(self.dropout.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct DualBranchNet<B: Backend> {
    pub eog_branch: SignalEncoder<B>,
    pub eeg_branch: SignalEncoder<B>,
    pub eog_head:   Linear<B>,
    pub eeg_head:   Linear<B>,
}

/// The four outputs of one forward pass.
///   c1 / c2 — class logits of the EOG / EEG heads, [batch, classes]
///   o1 / o2 — auxiliary embeddings of the EOG / EEG branches, [batch, embed_dim]
pub struct DualBranchOutput<B: Backend> {
    pub c1: Tensor<B, 2>,
    pub c2: Tensor<B, 2>,
    pub o1: Tensor<B, 2>,
    pub o2: Tensor<B, 2>,
}

impl<B: Backend> DualBranchOutput<B> {
    /// Logits of both heads summed, used for evaluation.
    pub fn combined_logits(&self) -> Tensor<B, 2> {
        self.c1.clone() + self.c2.clone()
    }
}

impl<B: Backend> DualBranchNet<B> {
    pub fn forward(&self, eog: Tensor<B, 3>, eeg: Tensor<B, 3>) -> DualBranchOutput<B> {
        let o1 = self.eog_branch.forward(eog);
        let o2 = self.eeg_branch.forward(eeg);
        let c1 = self.eog_head.forward(o1.clone());
        let c2 = self.eeg_head.forward(o2.clone());
        DualBranchOutput { c1, c2, o1, o2 }
    }
}
