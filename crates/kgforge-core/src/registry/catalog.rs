//! Seed catalog: Well-Architected pillars, deployment patterns, AWS services
//! and VPC components.

use crate::schema::EntityType;

use super::CanonicalEntity;

/// (name, description, synonyms)
type Seed = (&'static str, &'static str, &'static [&'static str]);

const PILLARS: &[Seed] = &[
    (
        "Operational Excellence",
        "The operational excellence pillar includes the ability to run and monitor systems to deliver business value and to continually improve supporting processes and procedures.",
        &["Ops Excellence", "Operational Excellence Pillar"],
    ),
    (
        "Security",
        "The security pillar includes the ability to protect information, systems, and assets while delivering business value through risk assessments and mitigation strategies.",
        &["Security Pillar"],
    ),
    (
        "Reliability",
        "The reliability pillar includes the ability of a workload to perform its intended function correctly and consistently when it's expected to.",
        &["Reliability Pillar"],
    ),
    (
        "Performance Efficiency",
        "The performance efficiency pillar includes the ability to use computing resources efficiently to meet system requirements, and to maintain that efficiency as demand changes and technologies evolve.",
        &["Performance Efficiency Pillar", "Performance"],
    ),
    (
        "Cost Optimization",
        "The cost optimization pillar includes the ability to run systems to deliver business value at the lowest price point.",
        &["Cost Optimization Pillar", "Cost"],
    ),
];

const PATTERNS: &[Seed] = &[
    (
        "Multi-AZ Deployment",
        "Deploying resources across multiple Availability Zones for high availability",
        &["Multi-AZ", "Multi Availability Zone", "Multi-AZ Pattern"],
    ),
    (
        "Blue-Green Deployment",
        "Deployment pattern where two identical production environments are maintained",
        &["Blue Green", "Blue/Green"],
    ),
    (
        "Canary Deployment",
        "Deployment pattern where new version is gradually rolled out to a subset of users",
        &["Canary"],
    ),
    (
        "Hub and Spoke",
        "Network topology where a central hub connects to multiple spoke networks",
        &["Hub-and-Spoke", "Hub & Spoke"],
    ),
    (
        "Serverless",
        "Architecture pattern using managed services that automatically scale",
        &["Serverless Architecture"],
    ),
];

const SERVICES: &[Seed] = &[
    (
        "Amazon EC2",
        "Elastic Compute Cloud - resizable compute capacity in the cloud",
        &["EC2", "Elastic Compute Cloud", "EC2 instance", "AWS EC2"],
    ),
    (
        "Amazon S3",
        "Simple Storage Service - object storage service",
        &["S3", "Simple Storage Service", "S3 bucket", "AWS S3"],
    ),
    ("Amazon DynamoDB", "NoSQL database service", &["DynamoDB", "AWS DynamoDB"]),
    (
        "Amazon RDS",
        "Relational Database Service - managed relational database",
        &["RDS", "Relational Database Service", "AWS RDS"],
    ),
    (
        "AWS Lambda",
        "Serverless compute service",
        &["Lambda", "Lambda function", "AWS Lambda"],
    ),
    (
        "Amazon VPC",
        "Virtual Private Cloud - isolated network environment",
        &["VPC", "Virtual Private Cloud", "AWS VPC"],
    ),
    (
        "AWS Transit Gateway",
        "Network transit hub for connecting VPCs",
        &["TGW", "Transit Gateway", "AWS Transit Gateway"],
    ),
    (
        "AWS Direct Connect",
        "Dedicated network connection to AWS",
        &["DX", "DirectConnect", "AWS Direct Connect"],
    ),
    (
        "AWS Site-to-Site VPN",
        "IPSec VPN connection between networks",
        &["VPN", "IPSec VPN", "Site-to-Site", "AWS VPN"],
    ),
    (
        "AWS Client VPN",
        "Managed client-based VPN service",
        &["Client VPN", "AWS Client VPN"],
    ),
    (
        "AWS IAM",
        "Identity and Access Management",
        &["IAM", "Identity and Access Management", "AWS IAM"],
    ),
    (
        "AWS CloudWatch",
        "Monitoring and observability service",
        &["CloudWatch", "AWS CloudWatch"],
    ),
    (
        "AWS CloudTrail",
        "Service for logging API calls",
        &["CloudTrail", "AWS CloudTrail"],
    ),
    (
        "Amazon Route 53",
        "DNS and domain name service",
        &["Route53", "Route 53", "R53", "AWS Route 53"],
    ),
    (
        "Elastic Load Balancing",
        "Load balancing service",
        &["ELB", "ALB", "NLB", "CLB", "Load Balancer", "AWS ELB"],
    ),
    (
        "AWS PrivateLink",
        "Private connectivity to AWS services",
        &["PrivateLink", "VPC Endpoint", "AWS PrivateLink"],
    ),
    (
        "Amazon CloudFront",
        "Content delivery network",
        &["CloudFront", "CDN", "AWS CloudFront"],
    ),
    (
        "AWS EKS",
        "Elastic Kubernetes Service",
        &["EKS", "Elastic Kubernetes Service", "AWS EKS"],
    ),
    ("Amazon SNS", "Simple Notification Service", &["SNS", "AWS SNS"]),
    ("Amazon SQS", "Simple Queue Service", &["SQS", "AWS SQS"]),
    ("Amazon Kinesis", "Streaming data service", &["Kinesis", "AWS Kinesis"]),
    (
        "AWS KMS",
        "Key Management Service",
        &["KMS", "Key Management Service", "AWS KMS"],
    ),
    (
        "AWS Organizations",
        "Account management and governance",
        &["Organizations", "AWS Organizations"],
    ),
    (
        "AWS Control Tower",
        "Multi-account governance service",
        &["Control Tower", "AWS Control Tower"],
    ),
    ("AWS Backup", "Centralized backup service", &["Backup", "AWS Backup"]),
    (
        "AWS Elastic Disaster Recovery",
        "Disaster recovery service",
        &["DRS", "Elastic Disaster Recovery", "AWS DRS"],
    ),
    ("Amazon GuardDuty", "Threat detection service", &["GuardDuty", "AWS GuardDuty"]),
    (
        "AWS WAF",
        "Web Application Firewall",
        &["WAF", "Web Application Firewall", "AWS WAF"],
    ),
    ("AWS Shield", "DDoS protection service", &["Shield", "AWS Shield"]),
    (
        "AWS Certificate Manager",
        "SSL/TLS certificate management",
        &["ACM", "Certificate Manager", "AWS ACM"],
    ),
    (
        "AWS IAM Identity Center",
        "Single sign-on and identity management",
        &["IAM Identity Center", "SSO", "AWS SSO"],
    ),
    ("Amazon Cognito", "User identity and access management", &["Cognito", "AWS Cognito"]),
];

const COMPONENTS: &[Seed] = &[
    ("EBS Volume", "Elastic Block Store volume", &["EBS", "Volume"]),
    ("VPC Subnet", "Subnet within a VPC", &["Subnet", "VPC Subnet"]),
    ("Security Group", "Virtual firewall for EC2 instances", &["SG", "Security Group"]),
    ("Network ACL", "Network access control list", &["NACL", "Network ACL"]),
    ("NAT Gateway", "Network Address Translation gateway", &["NAT", "NATGW"]),
    ("Internet Gateway", "Gateway for internet access", &["IGW", "Internet Gateway"]),
    ("Route Table", "Routing table for network traffic", &["Route Table"]),
    ("Elastic IP", "Static IPv4 address", &["EIP", "Elastic IP"]),
    ("VPC Endpoint", "Private connection to AWS services", &["Endpoint", "VPC Endpoint"]),
];

/// Every seed entity, grouped by type in registration order.
pub(super) fn seed_entities() -> Vec<CanonicalEntity> {
    let groups = [
        (EntityType::Pillar, PILLARS),
        (EntityType::Pattern, PATTERNS),
        (EntityType::Service, SERVICES),
        (EntityType::Component, COMPONENTS),
    ];

    groups
        .into_iter()
        .flat_map(|(entity_type, seeds)| {
            seeds.iter().map(move |(name, description, synonyms)| {
                CanonicalEntity::new(*name, entity_type.clone())
                    .with_description(*description)
                    .with_synonyms(synonyms.iter().copied())
            })
        })
        .collect()
}
