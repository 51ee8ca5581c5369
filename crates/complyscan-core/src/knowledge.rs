//! Compliance knowledge base
//!
//! Maps each issue category to the regulations that govern it, a short
//! explanation and an audit recommendation. The category order is also the
//! classifier's label order, so index `i` of the model output is
//! `KnowledgeBase::labels()[i]`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Explanation returned for categories missing from the taxonomy
pub const FALLBACK_EXPLANATION: &str = "暂无该问题类别的详细解释。";

/// Recommendation returned for categories missing from the taxonomy
pub const FALLBACK_RECOMMENDATION: &str = "建议咨询专业合规顾问进行进一步评估。";

/// A named regulation plus the clauses that apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegulationEntry {
    pub name: String,
    #[serde(default)]
    pub clauses: Vec<String>,
}

impl RegulationEntry {
    pub fn new(name: impl Into<String>, clauses: &[&str]) -> Self {
        Self {
            name: name.into(),
            clauses: clauses.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Single display string: the name followed by `、`-joined clauses
    pub fn flatten(&self) -> String {
        if self.clauses.is_empty() {
            self.name.clone()
        } else {
            format!("{}{}", self.name, self.clauses.join("、"))
        }
    }
}

/// Everything the knowledge base knows about one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCategory {
    pub name: String,
    pub regulations: Vec<RegulationEntry>,
    pub explanation: String,
    pub recommendation: String,
}

/// Lookup result; borrowed from the knowledge base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryGuidance<'a> {
    pub regulations: &'a [RegulationEntry],
    pub explanation: &'a str,
    pub recommendation: &'a str,
}

impl CategoryGuidance<'_> {
    /// Regulations flattened to display strings, in taxonomy order
    pub fn flattened_regulations(&self) -> Vec<String> {
        self.regulations.iter().map(RegulationEntry::flatten).collect()
    }
}

#[derive(Debug, Deserialize)]
struct TaxonomyFile {
    categories: Vec<IssueCategory>,
}

/// Immutable category -> guidance table
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    categories: Vec<IssueCategory>,
    index: HashMap<String, usize>,
}

impl KnowledgeBase {
    /// The built-in compliance taxonomy
    pub fn builtin() -> Self {
        Self::indexed(builtin_categories())
    }

    /// Build from an explicit category list, validating it
    pub fn from_categories(categories: Vec<IssueCategory>) -> Result<Self> {
        if categories.is_empty() {
            return Err(Error::config("taxonomy must contain at least one category"));
        }

        let mut seen = HashSet::new();
        for category in &categories {
            if category.name.trim().is_empty() {
                return Err(Error::config("taxonomy category with empty name"));
            }
            if !seen.insert(category.name.as_str()) {
                return Err(Error::config(format!(
                    "duplicate taxonomy category: {}",
                    category.name
                )));
            }
            if category.explanation.trim().is_empty() || category.recommendation.trim().is_empty()
            {
                return Err(Error::config(format!(
                    "category '{}' needs an explanation and a recommendation",
                    category.name
                )));
            }
            if category.regulations.is_empty() {
                return Err(Error::config(format!(
                    "category '{}' must list at least one regulation",
                    category.name
                )));
            }
        }

        Ok(Self::indexed(categories))
    }

    fn indexed(categories: Vec<IssueCategory>) -> Self {
        let index = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();

        Self { categories, index }
    }

    /// Load an operator-supplied taxonomy from YAML
    ///
    /// ```yaml
    /// categories:
    ///   - name: 财务合规
    ///     regulations:
    ///       - name: 《中华人民共和国会计法》
    ///         clauses: [第二十五条]
    ///     explanation: ...
    ///     recommendation: ...
    /// ```
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let file: TaxonomyFile = serde_yaml::from_str(&content).map_err(|e| {
            Error::config(format!("invalid taxonomy {}: {}", path.display(), e))
        })?;
        let kb = Self::from_categories(file.categories)?;
        tracing::info!(
            "Loaded {} taxonomy categories from {}",
            kb.len(),
            path.display()
        );
        Ok(kb)
    }

    /// Category guidance; unknown names yield the fallback strings
    pub fn lookup(&self, category: &str) -> CategoryGuidance<'_> {
        match self.index.get(category) {
            Some(&i) => {
                let c = &self.categories[i];
                CategoryGuidance {
                    regulations: &c.regulations,
                    explanation: &c.explanation,
                    recommendation: &c.recommendation,
                }
            }
            None => {
                tracing::debug!("Unknown issue category: {}", category);
                CategoryGuidance {
                    regulations: &[],
                    explanation: FALLBACK_EXPLANATION,
                    recommendation: FALLBACK_RECOMMENDATION,
                }
            }
        }
    }

    /// Category names in label order
    pub fn labels(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::builtin()
    }
}

fn category(
    name: &str,
    regulations: Vec<RegulationEntry>,
    explanation: &str,
    recommendation: &str,
) -> IssueCategory {
    IssueCategory {
        name: name.to_string(),
        regulations,
        explanation: explanation.to_string(),
        recommendation: recommendation.to_string(),
    }
}

fn builtin_categories() -> Vec<IssueCategory> {
    vec![
        category(
            "财务合规",
            vec![
                RegulationEntry::new("《中华人民共和国会计法》", &["第九条", "第二十五条", "第二十六条"]),
                RegulationEntry::new("《企业内部控制基本规范》", &["第五条", "第二十八条"]),
            ],
            "企业的会计核算、财务报告或资金管理可能存在不符合会计法规和内部控制要求的情形，如虚列收支、账外设账或财务信息披露不实。",
            "核查会计凭证与账簿的真实性和完整性，梳理资金审批流程，完善财务内部控制并定期开展内部审计。",
        ),
        category(
            "税务合规",
            vec![
                RegulationEntry::new("《中华人民共和国税收征收管理法》", &["第二十五条", "第六十三条"]),
                RegulationEntry::new("《中华人民共和国企业所得税法》", &["第八条", "第十条"]),
                RegulationEntry::new("《中华人民共和国发票管理办法》", &["第二十一条"]),
            ],
            "企业在纳税申报、发票开具或税前扣除方面可能存在少缴、漏缴税款或虚开发票的风险。",
            "复核近三年纳税申报与发票台账，确认税前扣除凭证合规，必要时主动补缴并与主管税务机关沟通。",
        ),
        category(
            "劳动用工合规",
            vec![
                RegulationEntry::new("《中华人民共和国劳动法》", &["第三十六条", "第四十四条"]),
                RegulationEntry::new("《中华人民共和国劳动合同法》", &["第十条", "第三十八条", "第八十二条"]),
                RegulationEntry::new("《社会保险法》", &["第五十八条"]),
            ],
            "企业在劳动合同签订、工时与加班、工资支付或社会保险缴纳方面可能违反劳动法律规定。",
            "全面核对劳动合同签订情况和社保缴纳记录，规范加班审批与工资发放，建立劳动争议预防机制。",
        ),
        category(
            "数据与隐私保护",
            vec![
                RegulationEntry::new("《中华人民共和国个人信息保护法》", &["第十三条", "第五十一条"]),
                RegulationEntry::new("《中华人民共和国数据安全法》", &["第二十七条"]),
                RegulationEntry::new("《中华人民共和国网络安全法》", &["第四十一条", "第四十二条"]),
            ],
            "企业收集、存储、使用或对外提供个人信息和重要数据的方式可能缺乏合法依据或安全保障措施。",
            "开展个人信息处理活动盘点和影响评估，完善告知同意机制，落实数据分类分级与访问控制。",
        ),
        category(
            "知识产权",
            vec![
                RegulationEntry::new("《中华人民共和国著作权法》", &["第五十二条", "第五十三条"]),
                RegulationEntry::new("《中华人民共和国专利法》", &["第十一条", "第六十五条"]),
                RegulationEntry::new("《中华人民共和国商标法》", &["第五十七条"]),
            ],
            "企业的产品、宣传材料或软件使用可能侵犯他人的著作权、专利权或商标权，或自身知识产权保护不足。",
            "梳理在用软件授权与第三方素材来源，开展专利与商标检索，及时对核心成果申请知识产权保护。",
        ),
        category(
            "合同管理",
            vec![
                RegulationEntry::new("《中华人民共和国民法典》", &["第四百六十五条", "第五百零九条", "第五百七十七条"]),
            ],
            "合同的订立、履行或变更过程可能存在条款缺失、审批不严或违约风险。",
            "建立合同分级审批与台账管理制度，重点审查付款、违约责任和争议解决条款，跟踪合同履行节点。",
        ),
        category(
            "反商业贿赂",
            vec![
                RegulationEntry::new("《中华人民共和国反不正当竞争法》", &["第七条", "第十九条"]),
                RegulationEntry::new("《中华人民共和国刑法》", &["第一百六十三条", "第一百六十四条"]),
            ],
            "业务往来中可能存在以回扣、礼品或其他利益输送方式谋取交易机会或竞争优势的行为。",
            "审查销售费用、佣金及招待支出的真实性，建立礼品与招待登记制度，开展反腐败合规培训。",
        ),
        category(
            "消费者权益保护",
            vec![
                RegulationEntry::new("《中华人民共和国消费者权益保护法》", &["第八条", "第二十条", "第五十五条"]),
                RegulationEntry::new("《中华人民共和国广告法》", &["第四条", "第二十八条"]),
            ],
            "企业的商品或服务在质量、信息披露、价格标示或售后处理方面可能损害消费者合法权益。",
            "核查商品宣传与实际质量的一致性，规范价格标示和退换货流程，建立投诉快速响应机制。",
        ),
        category(
            "环境保护合规",
            vec![
                RegulationEntry::new("《中华人民共和国环境保护法》", &["第四十二条", "第五十九条"]),
                RegulationEntry::new("《中华人民共和国环境影响评价法》", &["第十六条"]),
            ],
            "企业的生产经营活动可能存在超标排放、未批先建或环保设施运行不正常等环境违法风险。",
            "核对排污许可与环评批复，定期监测排放数据，确保环保设施正常运行并留存运行记录。",
        ),
        category(
            "反垄断合规",
            vec![
                RegulationEntry::new("《中华人民共和国反垄断法》", &["第十七条", "第二十二条", "第二十六条"]),
            ],
            "企业可能与竞争者达成价格或市场划分协议，或滥用市场支配地位，亦可能存在未依法申报的经营者集中。",
            "审查与竞争对手的沟通和合作协议，评估市场地位与定价策略，对并购交易进行经营者集中申报评估。",
        ),
        category(
            "安全生产合规",
            vec![
                RegulationEntry::new("《中华人民共和国安全生产法》", &["第四条", "第二十一条", "第四十一条"]),
            ],
            "企业可能未落实安全生产责任制、隐患排查治理或从业人员安全培训等法定义务。",
            "健全全员安全生产责任制，定期开展隐患排查与应急演练，完善安全培训和特种作业持证管理。",
        ),
    ]
}
